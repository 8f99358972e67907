//! Line directions and the name/direction resolver.
//!
//! Agencies publish a line's canonical name as `"<origin> - <destination>"`
//! and, separately, a raw direction string in the same shape. Comparing the
//! two segment by segment tells us whether the raw text describes the
//! forward or the backward run of the line.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Separator between origin and destination in names and directions.
pub const NAME_SEPARATOR: char = '-';

/// Travel direction of a line.
///
/// Every agency line is materialised twice, once per direction, and the
/// internal line id is the direction prefix followed by the agency id.
///
/// # Examples
///
/// ```
/// use transit_digest::domain::Direction;
///
/// assert_eq!(Direction::Forward.line_id("03"), "I03");
/// assert_eq!(Direction::Backward.line_id("A3"), "VA3");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// Both directions, forward first.
    ///
    /// Iteration order matters: connection resolution prefers the first
    /// direction for which a stop is a member.
    pub const ALL: [Direction; 2] = [Direction::Forward, Direction::Backward];

    /// Single-character prefix used in internal line ids.
    pub fn prefix(self) -> char {
        match self {
            Direction::Forward => 'I',
            Direction::Backward => 'V',
        }
    }

    /// Numeric code the agency uses for this direction in page addresses.
    pub fn number(self) -> &'static str {
        match self {
            Direction::Forward => "1",
            Direction::Backward => "2",
        }
    }

    /// The other direction.
    pub fn opposite(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }

    /// Build the direction-qualified internal id for an agency id.
    pub fn line_id(self, agency_id: &str) -> String {
        format!("{}{}", self.prefix(), agency_id)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => f.write_str("FORWARD"),
            Direction::Backward => f.write_str("BACKWARD"),
        }
    }
}

/// Split `"<origin> - <destination>"` into two raw trimmed segments.
fn split_segments(s: &str) -> Option<(&str, &str)> {
    let mut parts = s.split(NAME_SEPARATOR);
    let origin = parts.next()?;
    let destination = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some((origin.trim(), destination.trim()))
}

/// Trimmed, upper-cased segments of a name or direction.
fn normalized_segments(s: &str) -> Option<(String, String)> {
    split_segments(s).map(|(o, d)| (o.to_uppercase(), d.to_uppercase()))
}

/// Decide which direction a raw direction string describes.
///
/// Returns `Forward` when either the origins or the destinations match,
/// `Backward` when they only match crossed over, and an error otherwise.
/// Comparison ignores case and surrounding whitespace.
///
/// # Examples
///
/// ```
/// use transit_digest::domain::{Direction, resolve_direction};
///
/// let name = "ARANGOITI - PLAZA BIRIBILA";
/// assert_eq!(resolve_direction(name, "Arangoiti - Gran Via").unwrap(), Direction::Forward);
/// assert_eq!(resolve_direction(name, "Gran Via - Arangoiti").unwrap(), Direction::Backward);
/// assert!(resolve_direction(name, "Zamakola - Ayala").is_err());
/// ```
pub fn resolve_direction(name: &str, raw_direction: &str) -> Result<Direction, DomainError> {
    let malformed = || DomainError::MalformedName {
        name: name.to_string(),
        direction: raw_direction.to_string(),
    };
    let (name_origin, name_destination) = normalized_segments(name).ok_or_else(malformed)?;
    let (raw_origin, raw_destination) = normalized_segments(raw_direction).ok_or_else(malformed)?;

    if raw_origin == name_origin || raw_destination == name_destination {
        Ok(Direction::Forward)
    } else if raw_origin == name_destination || raw_destination == name_origin {
        Ok(Direction::Backward)
    } else {
        Err(DomainError::DirectionMismatch {
            name_origin,
            name_destination,
            raw_origin,
            raw_destination,
        })
    }
}

/// Fallback for sources that carry no direction text.
///
/// The first time an agency id shows up it is the forward run; once a
/// forward line for it is registered, the next occurrence is backward.
pub fn direction_by_appearance(agency_id: &str, is_registered: impl Fn(&str) -> bool) -> Direction {
    if is_registered(&Direction::Forward.line_id(agency_id)) {
        Direction::Backward
    } else {
        Direction::Forward
    }
}

/// Swap origin and destination: `"A - B"` becomes `"B - A"`.
///
/// Segment case is preserved.
pub fn reverse_name(name: &str) -> Result<String, DomainError> {
    let (origin, destination) = split_segments(name).ok_or_else(|| DomainError::MalformedName {
        name: name.to_string(),
        direction: String::new(),
    })?;
    Ok(format!("{destination} {NAME_SEPARATOR} {origin}"))
}
