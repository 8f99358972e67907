//! Line Builder: materializes one line per (agency id, direction).
//!
//! Three source shapes are understood:
//!
//! - stop rows, one per (line, direction, stop), where an order of `1`
//!   opens a new line;
//! - the agency's line-list page, whose `<option>` entries each yield a
//!   forward and a backward line;
//! - day and night enumerations of `id;name` rows.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use super::error::BuildError;
use super::state::RunState;
use super::text::{read_export, read_text};
use crate::config::DigestConfig;
use crate::domain::{
    Direction, Line, LineSummary, NAME_SEPARATOR, Stop, direction_by_appearance,
    resolve_direction, reverse_name,
};
use crate::source::{SourceKind, TransitSource};

/// Value of the line-list placeholder option.
const PLACEHOLDER_OPTION: &str = "0000";

/// Separator between codes in the connections column.
const CONNECTION_SEPARATOR: char = ',';

static OPTION_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("option[value]").expect("valid selector"));

/// Build lines from a `Lines` or `AgencyLines` source.
pub fn build_lines(
    source: &TransitSource,
    config: &DigestConfig,
    state: &mut RunState,
) -> Result<Vec<Line>, BuildError> {
    let kind = source
        .kind()
        .map_err(|e| BuildError::UnsupportedSource(e.0))?;
    let lines = match kind {
        SourceKind::Lines => {
            let text = read_export(&source.path)?;
            parse_stop_rows(&text, &source.path, config, state)?
        }
        SourceKind::AgencyLines => {
            let text = read_text(&source.path)?;
            parse_agency_lines(&text, &source.path, config, state)?
        }
        kind => {
            return Err(BuildError::WrongKind {
                stage: "line builder",
                kind,
            });
        }
    };

    info!(source = %source.id, lines = lines.len(), "built lines");
    Ok(lines)
}

/// Build a day or night enumeration.
pub fn build_line_summaries(
    source: &TransitSource,
    state: &mut RunState,
) -> Result<Vec<LineSummary>, BuildError> {
    let text = read_export(&source.path)?;
    let summaries = parse_line_summaries(&text, &source.path, state)?;
    info!(source = %source.id, lines = summaries.len(), "built line enumeration");
    Ok(summaries)
}

/// One row of a stop-row export.
#[derive(Debug)]
struct StopRow<'a> {
    agency_id: &'a str,
    name: &'a str,
    raw_direction: &'a str,
    order: u32,
    stop_id: &'a str,
    stop_name: &'a str,
    connections: &'a str,
}

impl<'a> StopRow<'a> {
    /// `None` for rows without a numeric stop order, header included.
    fn from_record(record: &'a csv::StringRecord) -> Option<Self> {
        Some(Self {
            agency_id: record.get(0)?.trim(),
            name: record.get(1)?.trim(),
            raw_direction: record.get(2)?.trim(),
            order: record.get(3)?.trim().parse().ok()?,
            stop_id: record.get(4)?.trim(),
            stop_name: record.get(5)?.trim(),
            connections: record.get(7).unwrap_or_default(),
        })
    }
}

fn semicolon_reader(text: &str, has_headers: bool) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(text.as_bytes())
}

/// Parse stop rows into lines, in order of first appearance.
///
/// Rows whose line cannot be resolved are skipped along with the rest of
/// that line's rows; nothing short of an empty result aborts the source.
pub fn parse_stop_rows(
    text: &str,
    path: &Path,
    config: &DigestConfig,
    state: &mut RunState,
) -> Result<Vec<Line>, BuildError> {
    let mut reader = semicolon_reader(text, false);
    let mut lines: Vec<Line> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut current: Option<usize> = None;

    for (row_number, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!(?path, row = row_number, error = %e, "unreadable row skipped");
                continue;
            }
        };
        let Some(row) = StopRow::from_record(&record) else {
            debug!(?path, row = row_number, "row without stop order skipped");
            continue;
        };
        if state.is_ignored(row.agency_id) {
            continue;
        }

        if row.order == 1 {
            current = open_line(&row, &mut lines, &mut index, config, state);
        }

        let Some(line) = current.and_then(|i| lines.get_mut(i)) else {
            debug!(row = row_number, agency_id = row.agency_id, "row of an unresolved line skipped");
            continue;
        };
        if line.agency_id != row.agency_id {
            warn!(
                row = row_number,
                line = %line.id,
                agency_id = row.agency_id,
                "row does not belong to the open line; skipped"
            );
            continue;
        }

        let stop = Stop::new(row.stop_id, row.stop_name)
            .with_connections(parse_connection_codes(row.connections, state));
        if !line.push_stop(stop, config.remove_duplicated_stops) {
            debug!(line = %line.id, stop = row.stop_id, "duplicated stop dropped");
        }
    }

    if lines.is_empty() {
        return Err(BuildError::NoLines(path.to_path_buf()));
    }
    Ok(lines)
}

/// Start the line a row with order 1 belongs to and return its index.
fn open_line(
    row: &StopRow<'_>,
    lines: &mut Vec<Line>,
    index: &mut HashMap<String, usize>,
    config: &DigestConfig,
    state: &mut RunState,
) -> Option<usize> {
    let (direction, display_name) = if row.raw_direction.is_empty() {
        let direction = direction_by_appearance(row.agency_id, |id| index.contains_key(id));
        let name = match direction {
            Direction::Forward => row.name.to_string(),
            Direction::Backward => reverse_name(row.name).unwrap_or_else(|_| row.name.to_string()),
        };
        (direction, name.to_uppercase())
    } else {
        match resolve_direction(row.name, row.raw_direction) {
            Ok(direction) => (direction, row.raw_direction.to_uppercase()),
            Err(e) => {
                warn!(agency_id = row.agency_id, error = %e, "line skipped");
                return None;
            }
        }
    };

    let number = state.numbers.number_for(row.agency_id);
    let mut line = Line::new(row.agency_id, number, display_name, direction);
    line.is_night_line = config.is_night_id(row.agency_id);

    if let Some(&i) = index.get(&line.id) {
        warn!(line = %line.id, "line opened twice; earlier stops discarded");
        lines[i] = line;
        return Some(i);
    }
    index.insert(line.id.clone(), lines.len());
    lines.push(line);
    Some(lines.len() - 1)
}

/// Split a raw connections field into bare agency codes, minus ignored ids.
pub fn parse_connection_codes(raw: &str, state: &RunState) -> Vec<String> {
    raw.split(CONNECTION_SEPARATOR)
        .map(str::trim)
        .filter(|code| !code.is_empty() && !state.is_ignored(code))
        .map(str::to_string)
        .collect()
}

/// Parse the agency line-list page.
///
/// Each option reads `"<id> - <origin> - <destination>"`; the forward line
/// takes that name and the backward line its reverse.
pub fn parse_agency_lines(
    html: &str,
    path: &Path,
    config: &DigestConfig,
    state: &mut RunState,
) -> Result<Vec<Line>, BuildError> {
    let document = Html::parse_document(html);
    let mut lines = Vec::new();

    for option in document.select(&OPTION_SELECTOR) {
        let Some(agency_id) = option.value().attr("value").map(str::trim) else {
            continue;
        };
        if agency_id.is_empty() || agency_id == PLACEHOLDER_OPTION || state.is_ignored(agency_id) {
            continue;
        }

        let label: String = option.text().collect();
        let Some(name) = option_line_name(&label, agency_id) else {
            warn!(agency_id, label = %label.trim(), "option without a line name skipped");
            continue;
        };
        let backward_name = match reverse_name(&name) {
            Ok(n) => n,
            Err(e) => {
                warn!(agency_id, error = %e, "line skipped");
                continue;
            }
        };

        let number = state.numbers.number_for(agency_id);
        let is_night_line = config.is_night_id(agency_id);
        for (direction, name) in [
            (Direction::Forward, name.clone()),
            (Direction::Backward, backward_name),
        ] {
            let mut line = Line::new(agency_id, number, name, direction);
            line.is_night_line = is_night_line;
            lines.push(line);
        }
    }

    if lines.is_empty() {
        return Err(BuildError::NoLines(path.to_path_buf()));
    }
    Ok(lines)
}

/// Strip the leading `"<id> -"` from an option label.
fn option_line_name(label: &str, agency_id: &str) -> Option<String> {
    let rest = label.trim().strip_prefix(agency_id)?;
    let name = rest.trim_start().strip_prefix(NAME_SEPARATOR)?.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Parse an `id;name` enumeration; the first row is a header.
pub fn parse_line_summaries(
    text: &str,
    path: &Path,
    state: &mut RunState,
) -> Result<Vec<LineSummary>, BuildError> {
    let mut reader = semicolon_reader(text, true);
    let mut summaries: Vec<LineSummary> = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|e| BuildError::csv(path, e))?;
        let (Some(agency_id), Some(name)) = (record.get(0), record.get(1)) else {
            debug!(?path, "short enumeration row skipped");
            continue;
        };
        let agency_id = agency_id.trim();
        if agency_id.is_empty() || state.is_ignored(agency_id) {
            continue;
        }
        if summaries.iter().any(|s| s.agency_id == agency_id) {
            warn!(?path, agency_id, "line listed twice; first entry kept");
            continue;
        }
        summaries.push(LineSummary {
            agency_id: agency_id.to_string(),
            number: state.numbers.number_for(agency_id),
            name: name.trim().to_string(),
        });
    }

    if summaries.is_empty() {
        warn!(?path, "line enumeration is empty");
    }
    Ok(summaries)
}
