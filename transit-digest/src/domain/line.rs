//! Lines and line summaries.

use serde::{Deserialize, Serialize};

use super::direction::Direction;
use super::stop::{Coordinates, Stop};

/// One direction of an agency line with its ordered stops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    /// Direction prefix followed by the agency id, e.g. `I03`.
    pub id: String,
    pub agency_id: String,
    pub number: u32,
    pub name: String,
    pub direction: Direction,
    pub stops: Vec<Stop>,
    /// Stop coordinates in stop order.
    pub map_route: Vec<Coordinates>,
    pub is_night_line: bool,
}

impl Line {
    /// Create a line with no stops yet.
    pub fn new(
        agency_id: impl Into<String>,
        number: u32,
        name: impl Into<String>,
        direction: Direction,
    ) -> Self {
        let agency_id = agency_id.into();
        Self {
            id: direction.line_id(&agency_id),
            agency_id,
            number,
            name: name.into(),
            direction,
            stops: Vec::new(),
            map_route: Vec::new(),
            is_night_line: false,
        }
    }

    /// True if the line serves a stop with this id.
    pub fn has_stop(&self, stop_id: &str) -> bool {
        self.stops.iter().any(|s| s.id == stop_id)
    }

    /// Append a stop, honouring the run-wide duplicate policy.
    ///
    /// Returns `false` when the stop was rejected as a duplicate.
    pub fn push_stop(&mut self, stop: Stop, remove_duplicates: bool) -> bool {
        if remove_duplicates && self.has_stop(&stop.id) {
            return false;
        }
        self.stops.push(stop);
        true
    }

    /// Rebuild the map route from the current stop locations.
    pub fn refresh_map_route(&mut self) {
        self.map_route = self.stops.iter().map(|s| s.location.clone()).collect();
    }
}

/// Entry of a day or night line enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSummary {
    pub agency_id: String,
    pub number: u32,
    pub name: String,
}
