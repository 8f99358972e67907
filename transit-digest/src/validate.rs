//! Consistency Validator: the last gate before a network is published.
//!
//! Lines are checked in order and the first defect stops the check for
//! the whole run. The report lists every line checked so far.

use std::fmt;

use tracing::{info, warn};

use crate::domain::{Line, Stop, TransitNetwork};

/// First structural defect found on a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Defect {
    NoStops,
    NoName,
    NoNumber,
    NoAgencyId,
    NoMapRoute,
    StopWithoutLocation(String),
    StopWithoutSchedule(String),
    StopWithoutName(String),
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Defect::NoStops => f.write_str("No stops."),
            Defect::NoName => f.write_str("No name."),
            Defect::NoNumber => f.write_str("No number."),
            Defect::NoAgencyId => f.write_str("No agencyId."),
            Defect::NoMapRoute => f.write_str("No map route."),
            Defect::StopWithoutLocation(id) => write!(f, "No location for stop {id}."),
            Defect::StopWithoutSchedule(id) => write!(f, "No schedule for stop {id}."),
            Defect::StopWithoutName(id) => write!(f, "No name for stop {id}."),
        }
    }
}

/// The network failed its consistency check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line} is inconsistent: {defect}")]
pub struct ConsistencyError {
    pub line: String,
    pub defect: Defect,
    /// Human-readable report up to and including the failing line.
    pub report: String,
}

const REPORT_HEADER: &str = "------ Lines check -------";

fn line_defect(line: &Line) -> Option<Defect> {
    if line.stops.is_empty() {
        Some(Defect::NoStops)
    } else if line.name.is_empty() {
        Some(Defect::NoName)
    } else if line.number == 0 {
        Some(Defect::NoNumber)
    } else if line.agency_id.is_empty() {
        Some(Defect::NoAgencyId)
    } else if line.map_route.is_empty() {
        Some(Defect::NoMapRoute)
    } else {
        line.stops.iter().find_map(stop_defect)
    }
}

fn stop_defect(stop: &Stop) -> Option<Defect> {
    if stop.location.is_empty() {
        Some(Defect::StopWithoutLocation(stop.id.clone()))
    } else if stop.schedule.is_empty() {
        Some(Defect::StopWithoutSchedule(stop.id.clone()))
    } else if stop.name.is_empty() {
        Some(Defect::StopWithoutName(stop.id.clone()))
    } else {
        None
    }
}

/// Check every line of the network, stopping at the first defect.
///
/// Returns the report on success.
pub fn check_consistency(network: &TransitNetwork) -> Result<String, ConsistencyError> {
    let mut report = String::from(REPORT_HEADER);

    for line in &network.lines {
        match line_defect(line) {
            None => {
                report.push_str(&format!("\nLine {}: Ok", line.id));
            }
            Some(defect) => {
                report.push_str(&format!("\nLine {}: {defect}", line.id));
                warn!(line = %line.id, %defect, "consistency check failed");
                return Err(ConsistencyError {
                    line: line.id.clone(),
                    defect,
                    report,
                });
            }
        }
    }

    info!(lines = network.lines.len(), "consistency check passed");
    Ok(report)
}
