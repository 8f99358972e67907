//! Point-in-time JSON snapshot of a finished network.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::TransitNetwork;
use crate::error::DigestError;

/// File holding the whole network.
pub const NETWORK_FILE: &str = "network.json";

/// Directory holding one file per line.
pub const LINES_DIR: &str = "lines";

/// Writes and reads network snapshots under one directory.
#[derive(Debug, Clone)]
pub struct Snapshot {
    dir: PathBuf,
}

impl Snapshot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write the network and each of its lines as pretty JSON.
    ///
    /// Creates the output directories if needed and returns every path
    /// written.
    pub fn write(&self, network: &TransitNetwork) -> Result<Vec<PathBuf>, DigestError> {
        let lines_dir = self.dir.join(LINES_DIR);
        std::fs::create_dir_all(&lines_dir).map_err(|source| DigestError::Snapshot {
            path: lines_dir.clone(),
            source,
        })?;

        let mut written = Vec::with_capacity(network.lines.len() + 1);
        let network_path = self.dir.join(NETWORK_FILE);
        write_json(&network_path, network)?;
        written.push(network_path);

        for line in &network.lines {
            let path = lines_dir.join(format!("{}.json", line.id));
            write_json(&path, line)?;
            written.push(path);
        }

        info!(dir = ?self.dir, files = written.len(), "snapshot written");
        Ok(written)
    }

    /// Read back a previously written network.
    ///
    /// Returns `None` if there is no snapshot or it cannot be parsed.
    pub fn load(&self) -> Option<TransitNetwork> {
        let contents = std::fs::read_to_string(self.dir.join(NETWORK_FILE)).ok()?;
        serde_json::from_str(&contents).ok()
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), DigestError> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(|source| DigestError::Snapshot {
        path: path.to_path_buf(),
        source,
    })
}
