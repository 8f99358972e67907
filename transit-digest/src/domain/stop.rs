//! Stops, their coordinates and their timetables.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stop coordinates, kept as published text.
///
/// Values are never parsed as floats so the output carries exactly the
/// precision and format the agency used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: String,
    pub longitude: String,
}

impl Coordinates {
    pub fn new(latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        Self {
            latitude: latitude.into(),
            longitude: longitude.into(),
        }
    }

    /// True if either component is missing.
    pub fn is_empty(&self) -> bool {
        self.latitude.is_empty() || self.longitude.is_empty()
    }
}

/// Day granularity at which agencies publish timetables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayType {
    Weekday,
    Saturday,
    Sunday,
}

impl DayType {
    /// All published day types, in fetch order.
    pub const ALL: [DayType; 3] = [DayType::Weekday, DayType::Saturday, DayType::Sunday];

    /// Token used for this day type in schedule page links.
    pub fn token(self) -> &'static str {
        match self {
            DayType::Weekday => "LA",
            DayType::Saturday => "SA",
            DayType::Sunday => "DO",
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayType::Weekday => f.write_str("weekday"),
            DayType::Saturday => f.write_str("saturday"),
            DayType::Sunday => f.write_str("sunday"),
        }
    }
}

/// Departure times per day type, each a comma-separated list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timetable {
    pub weekday: String,
    pub monday_to_thursday: String,
    pub friday: String,
    pub saturday: String,
    pub sunday: String,
}

impl Timetable {
    /// Store the times for a published day type.
    pub fn set(&mut self, day: DayType, times: String) {
        match day {
            DayType::Weekday => self.weekday = times,
            DayType::Saturday => self.saturday = times,
            DayType::Sunday => self.sunday = times,
        }
    }

    /// Friday and Monday–Thursday default to the weekday list when the
    /// source has nothing specific for them.
    pub fn apply_weekday_fallback(&mut self) {
        if self.friday.is_empty() {
            self.friday = self.weekday.clone();
        }
        if self.monday_to_thursday.is_empty() {
            self.monday_to_thursday = self.weekday.clone();
        }
    }

    /// True if no day carries any departure.
    pub fn is_empty(&self) -> bool {
        self.weekday.is_empty()
            && self.monday_to_thursday.is_empty()
            && self.friday.is_empty()
            && self.saturday.is_empty()
            && self.sunday.is_empty()
    }
}

/// A stop as served by one line in one direction.
///
/// Stops shared between lines are stored once per line; identity is the
/// agency stop id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    pub id: String,
    pub name: String,
    /// Connection codes: bare agency ids while building, direction-qualified
    /// line ids once the network is finalized.
    pub connections: Vec<String>,
    pub schedule: Timetable,
    pub location: Coordinates,
}

impl Stop {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Attach raw connection codes.
    pub fn with_connections(mut self, connections: Vec<String>) -> Self {
        self.connections = connections;
        self
    }

    /// Attach coordinates.
    pub fn with_location(mut self, location: Coordinates) -> Self {
        self.location = location;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_emptiness() {
        assert!(Coordinates::default().is_empty());
        assert!(Coordinates::new("43.26", "").is_empty());
        assert!(!Coordinates::new("43.26", "-2.93").is_empty());
    }

    #[test]
    fn weekday_fallback_fills_missing_days() {
        let mut t = Timetable::default();
        t.set(DayType::Weekday, "06:30,07:00".into());
        t.friday = "06:45".into();
        t.apply_weekday_fallback();

        assert_eq!(t.friday, "06:45");
        assert_eq!(t.monday_to_thursday, "06:30,07:00");
    }

    #[test]
    fn timetable_emptiness() {
        let mut t = Timetable::default();
        assert!(t.is_empty());
        t.set(DayType::Sunday, "10:00".into());
        assert!(!t.is_empty());
        assert_eq!(t.sunday, "10:00");
    }

    #[test]
    fn day_tokens() {
        let tokens: Vec<_> = DayType::ALL.iter().map(|d| d.token()).collect();
        assert_eq!(tokens, ["LA", "SA", "DO"]);
    }

    #[test]
    fn serializes_camel_case() {
        let stop = Stop::new("0253", "Arangoiti")
            .with_location(Coordinates::new("43.2630", "-2.9350"));
        let json = serde_json::to_value(&stop).unwrap();
        assert_eq!(json["schedule"]["mondayToThursday"], "");
        assert_eq!(json["location"]["latitude"], "43.2630");
    }
}
