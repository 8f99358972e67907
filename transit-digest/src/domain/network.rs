//! The aggregate network model produced by one digestion run.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::line::{Line, LineSummary};
use super::stop::Stop;

/// Position of a stop inside the network's line arena.
///
/// Handles stay valid as long as lines and their stop lists are not
/// reordered, which holds between building and publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StopHandle {
    pub line: usize,
    pub stop: usize,
}

/// Point-in-time stamp of a finished network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkVersion {
    /// `YYYYMMDDHHMM` of the generation time, UTC.
    pub version: String,
    /// RFC 3339 generation time.
    pub generated_at: String,
}

impl NetworkVersion {
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            version: time.format("%Y%m%d%H%M").to_string(),
            generated_at: time.to_rfc3339(),
        }
    }
}

/// All lines of an agency plus the derived views over them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitNetwork {
    pub lines: Vec<Line>,
    /// One entry per distinct stop id, filled at finalization.
    pub stops: Vec<Stop>,
    pub day_lines: Vec<LineSummary>,
    pub night_lines: Vec<LineSummary>,
    pub version: Option<NetworkVersion>,
}

impl TransitNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a line by its internal id.
    pub fn line(&self, id: &str) -> Option<&Line> {
        self.lines.iter().find(|l| l.id == id)
    }

    /// Handles of every stop of every line, in line then stop order.
    pub fn stop_handles(&self) -> Vec<StopHandle> {
        self.lines
            .iter()
            .enumerate()
            .flat_map(|(line, l)| (0..l.stops.len()).map(move |stop| StopHandle { line, stop }))
            .collect()
    }

    /// Resolve a handle to its stop.
    pub fn stop_mut(&mut self, handle: StopHandle) -> Option<&mut Stop> {
        self.lines
            .get_mut(handle.line)
            .and_then(|l| l.stops.get_mut(handle.stop))
    }

    /// Mark every line whose number appears in the night enumeration.
    ///
    /// Returns how many lines were newly tagged.
    pub fn tag_night_lines(&mut self) -> usize {
        let night_numbers: HashSet<u32> = self.night_lines.iter().map(|s| s.number).collect();
        let mut tagged = 0;
        for line in &mut self.lines {
            if !line.is_night_line && night_numbers.contains(&line.number) {
                line.is_night_line = true;
                tagged += 1;
            }
        }
        tagged
    }

    /// Collect the global stop list: first occurrence of each stop id wins.
    pub fn extract_stops(&mut self) {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut stops = Vec::new();
        for line in &self.lines {
            for stop in &line.stops {
                if seen.insert(stop.id.as_str()) {
                    stops.push(stop.clone());
                }
            }
        }
        self.stops = stops;
    }
}
