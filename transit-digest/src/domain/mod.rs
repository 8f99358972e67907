//! Domain types for the transit network model.
//!
//! Lines, stops and timetables as they are published, plus the
//! direction resolver that reconciles a line's canonical name with the
//! direction text reported by each source.

mod direction;
mod error;
mod line;
mod network;
mod stop;

pub use direction::{
    Direction, NAME_SEPARATOR, direction_by_appearance, resolve_direction, reverse_name,
};
pub use error::DomainError;
pub use line::{Line, LineSummary};
pub use network::{NetworkVersion, StopHandle, TransitNetwork};
pub use stop::{Coordinates, DayType, Stop, Timetable};
