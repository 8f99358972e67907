//! Builder stages that turn local source artifacts into lines and stops.
//!
//! Every stage runs sequentially and mutates the network under
//! construction through the per-run [`RunState`].

mod connections;
mod error;
mod lines;
mod location;
mod remediate;
mod state;
mod stops;
mod text;

pub use connections::{ConnectionReport, UnresolvedConnection, decorate_connections};
pub use error::BuildError;
pub use lines::{
    build_line_summaries, build_lines, parse_agency_lines, parse_connection_codes,
    parse_line_summaries, parse_stop_rows,
};
pub use location::{GTFS_STOPS_MEMBER, StopLocations, build_locations, decorate_locations, parse_gtfs_stops};
pub use remediate::remediate_line_name;
pub use state::{GENERATED_NUMBER_BASE, LineNumbers, RunState};
pub use stops::{LineStops, build_stops, page_file_name, parse_line_page};
pub use text::{decode, decode_export, read_export, read_text};
