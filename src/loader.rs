//! Schema loading from various sources.
//!
//! [`SchemaLoader`] is the seam between the resolver and the outside world.
//! Files are read with [`FileLoader`], HTTP(S) documents are fetched with
//! `HttpLoader`, and [`AutoLoader`] picks between the two per location.
//! No loader caches: every call performs exactly one read or round trip.

use std::path::{Path, PathBuf};

use crate::error::ResolveError;
use crate::location::Location;
use crate::schema::Schema;

#[cfg(feature = "remote")]
use std::time::Duration;

#[cfg(feature = "remote")]
use url::Url;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches the schema document at a resolved location.
pub trait SchemaLoader {
    /// Load and decode the document at `location`.
    ///
    /// # Errors
    ///
    /// Returns a not-found class error if the document doesn't exist, or an
    /// IO/decode class error if it can't be read or isn't a JSON object.
    fn load(&self, location: &Location) -> Result<Schema, ResolveError>;
}

/// Load a schema from a file path.
///
/// # Errors
///
/// Returns `ResolveError::FileNotFound` if the file doesn't exist,
/// or `ResolveError::InvalidJson` if the file isn't valid JSON.
pub fn load_schema(path: &Path) -> Result<Schema, ResolveError> {
    if !path.exists() {
        return Err(ResolveError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| ResolveError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    Schema::parse(&content, &path.display().to_string())
}

/// Loads schemas from a base directory.
#[derive(Debug, Clone)]
pub struct FileLoader {
    base_dir: PathBuf,
}

impl FileLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Map a location onto the filesystem. Absolute paths ignore the base.
    pub fn path_for(&self, location: &Location) -> PathBuf {
        self.base_dir.join(location.as_str())
    }
}

impl SchemaLoader for FileLoader {
    fn load(&self, location: &Location) -> Result<Schema, ResolveError> {
        if location.is_url() {
            return Err(ResolveError::FileNotFound {
                path: PathBuf::from(location.as_str()),
            });
        }

        let path = self.path_for(location);
        tracing::debug!(path = %path.display(), "loading schema file");
        load_schema(&path)
    }
}

/// Loads schemas over HTTP(S) relative to a base URL.
///
/// Requires the `remote` feature (enabled by default).
#[cfg(feature = "remote")]
#[derive(Debug, Clone)]
pub struct HttpLoader {
    base_url: Url,
    client: reqwest::blocking::Client,
}

#[cfg(feature = "remote")]
impl HttpLoader {
    /// Create a loader rooted at `base_url`.
    ///
    /// The base is treated as a directory: `https://host/schemas` and
    /// `https://host/schemas/` both resolve `a.json` to
    /// `https://host/schemas/a.json`.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::InvalidUrl` if the base URL cannot be parsed,
    /// or `ResolveError::NetworkError` if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, ResolveError> {
        let mut url = Url::parse(base_url).map_err(|source| ResolveError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        if !url.path().ends_with('/') {
            let dir = format!("{}/", url.path());
            url.set_path(&dir);
        }

        Ok(Self {
            base_url: url,
            client: build_client(base_url, HTTP_TIMEOUT)?,
        })
    }

    /// Replace the default request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ResolveError> {
        self.client = build_client(self.base_url.as_str(), timeout)?;
        Ok(self)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join a location onto the base URL (RFC 3986 reference resolution).
    pub fn url_for(&self, location: &Location) -> Result<Url, ResolveError> {
        self.base_url
            .join(location.as_str())
            .map_err(|source| ResolveError::InvalidUrl {
                url: location.to_string(),
                source,
            })
    }
}

#[cfg(feature = "remote")]
impl SchemaLoader for HttpLoader {
    fn load(&self, location: &Location) -> Result<Schema, ResolveError> {
        let url = self.url_for(location)?;
        load_schema_url(&self.client, url.as_str())
    }
}

#[cfg(feature = "remote")]
fn build_client(url: &str, timeout: Duration) -> Result<reqwest::blocking::Client, ResolveError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|source| ResolveError::NetworkError {
            url: url.to_string(),
            source,
        })
}

/// Fetch a schema from an absolute HTTP(S) URL.
///
/// # Errors
///
/// Returns `ResolveError::HttpStatus` for 4xx/5xx responses,
/// `ResolveError::NetworkError` if the request fails, or
/// `ResolveError::InvalidJson` if the body isn't valid JSON.
#[cfg(feature = "remote")]
fn load_schema_url(client: &reqwest::blocking::Client, url: &str) -> Result<Schema, ResolveError> {
    tracing::debug!(url, "fetching schema");

    let response = client
        .get(url)
        .send()
        .map_err(|source| ResolveError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    // Check for HTTP errors before parsing
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        return Err(ResolveError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().map_err(|source| ResolveError::NetworkError {
        url: url.to_string(),
        source,
    })?;

    Schema::parse(&body, url)
}

/// Loads absolute URLs over HTTP(S) and everything else from a directory.
///
/// URL loading requires the `remote` feature; without it URL locations
/// report `ResolveError::FileNotFound`.
#[derive(Debug, Clone)]
pub struct AutoLoader {
    files: FileLoader,
    #[cfg(feature = "remote")]
    client: reqwest::blocking::Client,
}

impl AutoLoader {
    /// # Errors
    ///
    /// Returns `ResolveError::NetworkError` if the HTTP client cannot be built.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, ResolveError> {
        let files = FileLoader::new(base_dir);
        Ok(Self {
            #[cfg(feature = "remote")]
            client: build_client(&files.base_dir().display().to_string(), HTTP_TIMEOUT)?,
            files,
        })
    }
}

impl SchemaLoader for AutoLoader {
    fn load(&self, location: &Location) -> Result<Schema, ResolveError> {
        if location.is_url() {
            #[cfg(feature = "remote")]
            {
                load_schema_url(&self.client, location.as_str())
            }
            #[cfg(not(feature = "remote"))]
            {
                Err(ResolveError::FileNotFound {
                    path: PathBuf::from(location.as_str()),
                })
            }
        } else {
            self.files.load(location)
        }
    }
}
