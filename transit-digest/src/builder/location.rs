//! Stop locations from the agency's GTFS feed.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use super::error::BuildError;
use super::text::read_text;
use crate::domain::{Coordinates, Line};
use crate::fetch::extract_member;
use crate::source::{SourceKind, TransitSource};

/// Archive member holding stop coordinates.
pub const GTFS_STOPS_MEMBER: &str = "stops.txt";

/// Column positions used when the header does not name them.
const DEFAULT_COLUMNS: (usize, usize, usize) = (0, 4, 5);

/// Map of stop id to coordinates.
pub type StopLocations = HashMap<String, Coordinates>;

/// Parse a GTFS `stops.txt` table.
pub fn parse_gtfs_stops(text: &str, path: &Path) -> Result<StopLocations, BuildError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers().map_err(|e| BuildError::csv(path, e))?.clone();
    let column = |name: &str, default: usize| {
        headers
            .iter()
            .position(|h| h.trim().trim_start_matches('\u{feff}') == name)
            .unwrap_or(default)
    };
    let (id_at, lat_at, lon_at) = (
        column("stop_id", DEFAULT_COLUMNS.0),
        column("stop_lat", DEFAULT_COLUMNS.1),
        column("stop_lon", DEFAULT_COLUMNS.2),
    );

    let mut locations = StopLocations::new();
    for record in reader.records() {
        let record = record.map_err(|e| BuildError::csv(path, e))?;
        let (Some(id), Some(lat), Some(lon)) =
            (record.get(id_at), record.get(lat_at), record.get(lon_at))
        else {
            debug!(?path, "short GTFS stop row skipped");
            continue;
        };
        locations.insert(id.trim().to_string(), Coordinates::new(lat.trim(), lon.trim()));
    }
    Ok(locations)
}

/// Assign coordinates to every stop and rebuild map routes.
///
/// Stops absent from the feed keep whatever location they had. Returns
/// the number of stops left without one.
pub fn decorate_locations(lines: &mut [Line], locations: &StopLocations) -> usize {
    let mut missing = 0;
    for line in lines.iter_mut() {
        for stop in &mut line.stops {
            if let Some(location) = locations.get(&stop.id) {
                stop.location = location.clone();
            }
            if stop.location.is_empty() {
                debug!(line = %line.id, stop = %stop.id, "stop without location");
                missing += 1;
            }
        }
        line.refresh_map_route();
    }
    missing
}

/// Decorate lines from a `Location` source whose `path` is the GTFS zip.
///
/// `stops.txt` is extracted next to the archive.
pub fn build_locations(lines: &mut [Line], source: &TransitSource) -> Result<usize, BuildError> {
    match source.kind() {
        Ok(SourceKind::Location) => {}
        Ok(kind) => {
            return Err(BuildError::WrongKind {
                stage: "location decorator",
                kind,
            });
        }
        Err(e) => return Err(BuildError::UnsupportedSource(e.0)),
    }

    let dest_dir = source.path.parent().unwrap_or(Path::new("."));
    let stops_file = extract_member(&source.path, GTFS_STOPS_MEMBER, dest_dir)?;
    let locations = parse_gtfs_stops(&read_text(&stops_file)?, &stops_file)?;
    let missing = decorate_locations(lines, &locations);

    info!(known = locations.len(), missing, "decorated stop locations");
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, Stop};
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const STOPS_TXT: &str = "stop_id,stop_code,stop_name,stop_desc,stop_lat,stop_lon\n\
                             0253,253,Arangoiti,,43.2630,-2.9350\n\
                             0254,254,Zumaia,,43.2631,-2.9351\n";

    #[test]
    fn parses_by_header() {
        let text = "stop_lat,stop_lon,stop_id\n43.1,-2.9,0253\n";
        let locations = parse_gtfs_stops(text, Path::new("stops.txt")).unwrap();
        assert_eq!(locations["0253"], Coordinates::new("43.1", "-2.9"));
    }

    #[test]
    fn falls_back_to_agency_columns() {
        let text = "a,b,c,d,e,f\n0253,x,y,z,43.2630,-2.9350\n";
        let locations = parse_gtfs_stops(text, Path::new("stops.txt")).unwrap();
        assert_eq!(locations["0253"], Coordinates::new("43.2630", "-2.9350"));
    }

    #[test]
    fn decoration_counts_missing_and_rebuilds_route() {
        let locations = parse_gtfs_stops(STOPS_TXT, Path::new("stops.txt")).unwrap();
        let mut line = Line::new("03", 3, "A - B", Direction::Forward);
        line.push_stop(Stop::new("0253", "Arangoiti"), false);
        line.push_stop(Stop::new("9999", "Nowhere"), false);
        let mut lines = vec![line];

        assert_eq!(decorate_locations(&mut lines, &locations), 1);
        assert_eq!(lines[0].map_route.len(), 2);
        assert_eq!(lines[0].map_route[0], Coordinates::new("43.2630", "-2.9350"));
        assert!(lines[0].map_route[1].is_empty());
    }

    #[test]
    fn builds_from_archive() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("gtfs.zip");
        let mut writer = zip::ZipWriter::new(File::create(&archive).unwrap());
        writer
            .start_file(GTFS_STOPS_MEMBER, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(STOPS_TXT.as_bytes()).unwrap();
        writer.finish().unwrap();

        let mut line = Line::new("03", 3, "A - B", Direction::Forward);
        line.push_stop(Stop::new("0254", "Zumaia"), false);
        let mut lines = vec![line];

        let source = TransitSource::new("Location", &archive, "http://x/gtfs.zip");
        assert_eq!(build_locations(&mut lines, &source).unwrap(), 0);
        assert_eq!(lines[0].stops[0].location, Coordinates::new("43.2631", "-2.9351"));
        assert!(dir.path().join(GTFS_STOPS_MEMBER).exists());
    }
}
