//! Builder stage error types.

use std::path::PathBuf;

use crate::fetch::FetchError;
use crate::source::SourceKind;

/// Errors raised while digesting a source into lines and stops.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The source kind is not handled by this stage
    #[error("unsupported source: {0}")]
    UnsupportedSource(String),

    /// A stage was handed a source of the wrong kind
    #[error("{stage} cannot digest {kind} sources")]
    WrongKind {
        stage: &'static str,
        kind: SourceKind,
    },

    /// Parallel scrape matches disagree in count
    #[error(
        "inconsistent extraction in {page:?}: {names} names, {ids} ids, \
         {positions} positions, {connections} connection blocks"
    )]
    InconsistentExtraction {
        page: PathBuf,
        names: usize,
        ids: usize,
        positions: usize,
        connections: usize,
    },

    /// A stop block tag names neither direction
    #[error("stop tag {0:?} does not match any known direction")]
    UnknownDirectionTag(String),

    /// The source yielded no lines at all
    #[error("no lines found in {0:?}")]
    NoLines(PathBuf),

    /// A stop page yielded no stops at all
    #[error("no stops found in {0:?}")]
    NoStops(PathBuf),

    /// Tabular source could not be read
    #[error("CSV error in {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Local artifact could not be read or written
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Downloading an artifact failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A configured line name could not be applied
    #[error("line {agency_id} not renamed to {expected:?}: {reason}")]
    Remediation {
        agency_id: String,
        expected: String,
        reason: String,
    },
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        BuildError::Csv {
            path: path.into(),
            source,
        }
    }
}
