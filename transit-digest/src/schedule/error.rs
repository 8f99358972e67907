//! Schedule pipeline error types.

use std::path::PathBuf;

use crate::fetch::FetchError;
use crate::source::SourceKind;

/// Errors from the schedule stage.
///
/// Only [`ScheduleError::SeasonUndetermined`] and source mismatches abort
/// the stage; the rest are per-unit and end up in the report.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// No summer window is configured, so no page can be dated
    #[error("season undetermined: summer window is not configured")]
    SeasonUndetermined,

    /// The source id names no known kind
    #[error("unsupported source: {0}")]
    UnsupportedSource(String),

    /// The stage was handed a source of another kind
    #[error("schedule pipeline cannot digest {0} sources")]
    WrongKind(SourceKind),

    /// Downloading a schedule page failed after every attempt
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A schedule page could not be read
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A day pattern failed to compile
    #[error("invalid schedule pattern: {0}")]
    Pattern(#[from] regex::Error),
}
