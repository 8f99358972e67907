//! Timetable season selection.

use std::fmt;

use chrono::{DateTime, Utc};

use super::error::ScheduleError;
use crate::config::SummerWindow;

/// Timetable variant in force on a given date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Winter,
    Summer,
}

impl Season {
    /// Token used for this season in schedule page addresses and links.
    pub fn token(self) -> &'static str {
        match self {
            Season::Winter => "IN",
            Season::Summer => "VE",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Season::Winter => f.write_str("winter"),
            Season::Summer => f.write_str("summer"),
        }
    }
}

/// Season in force at `now`: summer inside the window, winter outside.
pub fn season_at(window: Option<&SummerWindow>, now: DateTime<Utc>) -> Result<Season, ScheduleError> {
    let window = window.ok_or(ScheduleError::SeasonUndetermined)?;
    Ok(if window.contains(now) {
        Season::Summer
    } else {
        Season::Winter
    })
}
