//! Fetch error types.

use std::path::PathBuf;

/// Errors from downloading or unpacking source artifacts.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("bad status {status} for {uri}")]
    Status { status: u16, uri: String },

    /// Address has a scheme we do not transport
    #[error("unsupported scheme in {0}")]
    UnsupportedScheme(String),

    /// Address cannot be parsed
    #[error("invalid address {uri}: {message}")]
    InvalidAddress { uri: String, message: String },

    /// Content was written but never passed validation
    #[error("{path:?} failed validation after {attempts} attempts")]
    Invalid { path: PathBuf, attempts: u32 },

    /// Local filesystem error
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Archive cannot be opened or lacks the requested member
    #[error("archive {path:?}: {message}")]
    Archive { path: PathBuf, message: String },
}

impl FetchError {
    /// Wrap a `std::io::Error` with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
