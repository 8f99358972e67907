//! Top-level error type for a digestion run.

use std::path::PathBuf;

use crate::builder::BuildError;
use crate::config::ConfigError;
use crate::fetch::FetchError;
use crate::schedule::ScheduleError;
use crate::validate::ConsistencyError;

/// Errors surfaced by the orchestrator and the binary.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    /// Snapshot output could not be written
    #[error("cannot write snapshot {path:?}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot serialization failed
    #[error("cannot serialize snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

impl DigestError {
    /// True if the error must halt the whole run rather than one source.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DigestError::Schedule(ScheduleError::SeasonUndetermined) | DigestError::Consistency(_)
        )
    }
}
