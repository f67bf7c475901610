//! Error types for schema dereferencing.

use std::path::PathBuf;
use thiserror::Error;

/// Broad failure class of a [`ResolveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced definition, file, or URL does not exist.
    NotFound,
    /// Filesystem or network failure unrelated to existence.
    Io,
    /// A loaded document is not valid JSON or not schema-shaped.
    Decode,
    /// A reference re-enters a schema that is still being resolved.
    Cycle,
}

/// Errors during reference resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    // Not found (exit code 3)
    #[error("definition \"{name}\" not found in {location}")]
    DefinitionNotFound { name: String, location: String },

    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to fetch {url}: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    // IO errors (exit code 3)
    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    // Decode errors (exit code 2)
    #[error("invalid JSON in {location}: {source}")]
    InvalidJson {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("schema at {location} must be an object, got {actual}")]
    NotAnObject { location: String, actual: String },

    #[error("unsupported $ref {reference:?} in {location}")]
    InvalidReference { location: String, reference: String },

    // Cycle errors (exit code 2)
    #[error("circular reference: {}", chain.join(" -> "))]
    CircularReference { chain: Vec<String> },
}

impl ResolveError {
    /// Returns the failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DefinitionNotFound { .. } | Self::FileNotFound { .. } | Self::HttpStatus { .. } => {
                ErrorKind::NotFound
            }
            Self::ReadError { .. } | Self::InvalidUrl { .. } => ErrorKind::Io,
            #[cfg(feature = "remote")]
            Self::NetworkError { .. } => ErrorKind::Io,
            Self::InvalidJson { .. } | Self::NotAnObject { .. } | Self::InvalidReference { .. } => {
                ErrorKind::Decode
            }
            Self::CircularReference { .. } => ErrorKind::Cycle,
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::NotFound | ErrorKind::Io => 3,
            ErrorKind::Decode | ErrorKind::Cycle => 2,
        }
    }
}
