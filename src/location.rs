//! Logical document locations and reference joining.
//!
//! A location is either a slash-separated path (relative to the loader's base,
//! or absolute) or an absolute HTTP(S) URL. References are always joined
//! against the *directory* of the current location.

use std::fmt;

use url::Url;

use crate::error::ResolveError;

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Where a schema document was loaded from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Location(String);

impl Location {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_url(&self) -> bool {
        is_url(&self.0)
    }

    /// Directory part of the location, including the trailing slash.
    ///
    /// Empty for a bare file name.
    pub fn dir(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[..=idx],
            None => "",
        }
    }

    /// Resolve `reference` relative to the directory of this location.
    ///
    /// Absolute URLs and absolute paths replace the location outright.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::InvalidUrl` if a URL cannot be parsed or joined.
    pub fn join(&self, reference: &str) -> Result<Location, ResolveError> {
        if is_url(reference) {
            let url = parse_url(reference)?;
            return Ok(Location(url.to_string()));
        }

        if self.is_url() {
            let base = parse_url(&self.0)?;
            let joined = base
                .join(reference)
                .map_err(|source| ResolveError::InvalidUrl {
                    url: format!("{} + {}", self.0, reference),
                    source,
                })?;
            return Ok(Location(joined.to_string()));
        }

        if reference.starts_with('/') {
            return Ok(Location(normalize(reference)));
        }

        Ok(Location(normalize(&format!("{}{}", self.dir(), reference))))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Location {
    fn from(location: &str) -> Self {
        Self::new(location)
    }
}

fn parse_url(raw: &str) -> Result<Url, ResolveError> {
    Url::parse(raw).map_err(|source| ResolveError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

/// Collapse `.`, `..` and empty segments in a slash-separated path.
///
/// Leading `..` segments of a relative path are kept so the loader can
/// still step above its base directory.
fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                // Can't go above the filesystem root
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}
