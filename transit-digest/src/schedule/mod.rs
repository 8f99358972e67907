//! Schedule Fetch Pipeline: per-stop timetables from seasonal pages.

mod error;
mod extract;
mod pipeline;
mod season;

pub use error::ScheduleError;
pub use extract::{TIME_SEPARATOR, departure_pattern, extract_times, is_schedule_page, parse_timetable};
pub use pipeline::{
    ScheduleReport, ScheduleUnit, UnitState, fetch_schedules, page_file_name, plan_units,
};
pub use season::{Season, season_at};
