//! Departure time extraction from schedule pages.
//!
//! A stop's schedule page links every departure as an anchor whose query
//! names the line, season, day type and direction. Matching those four
//! fields picks out one day's departures.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::season::Season;
use crate::domain::{DayType, Direction, Timetable};
use crate::source::{TOKEN_LINE, TOKEN_SEASON};

const TOKEN_DAY: &str = "{day}";
const TOKEN_DIRECTION: &str = "{direction}";

/// Separator between departure times in a timetable field.
pub const TIME_SEPARATOR: &str = ",";

const DEPARTURE_TEMPLATE: &str = concat!(
    r#"<a href="horario-estimado\?codLinea={line}&amp;temporada={season}"#,
    r#"&amp;servicio=\d{0,3}&amp;tipodia={day}&amp;sentido={direction}"#,
    r#"&amp;hora=[^"]*">([^<]*)<"#,
);

static SCHEDULE_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<a href="horario-estimado\?codLinea="#).expect("valid regex"));

/// Compile the departure pattern for one line, season, day and direction.
pub fn departure_pattern(
    agency_id: &str,
    season: Season,
    day: DayType,
    direction: Direction,
) -> Result<Regex, regex::Error> {
    let pattern = DEPARTURE_TEMPLATE
        .replace(TOKEN_LINE, &regex::escape(agency_id))
        .replace(TOKEN_SEASON, season.token())
        .replace(TOKEN_DAY, day.token())
        .replace(TOKEN_DIRECTION, direction.number());
    Regex::new(&pattern)
}

/// Departure times of one day, in document order, or `None` if the page
/// lists none.
pub fn extract_times(html: &str, pattern: &Regex) -> Option<String> {
    let times: Vec<&str> = pattern
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .collect();
    (!times.is_empty()).then(|| times.join(TIME_SEPARATOR))
}

/// Build a stop's timetable from its schedule page.
///
/// Returns the timetable and the day types the page had nothing for.
pub fn parse_timetable(
    html: &str,
    agency_id: &str,
    season: Season,
    direction: Direction,
) -> Result<(Timetable, Vec<DayType>), regex::Error> {
    let mut timetable = Timetable::default();
    let mut missing = Vec::new();

    for day in DayType::ALL {
        let pattern = departure_pattern(agency_id, season, day, direction)?;
        match extract_times(html, &pattern) {
            Some(times) => timetable.set(day, times),
            None => missing.push(day),
        }
    }
    timetable.apply_weekday_fallback();
    Ok((timetable, missing))
}

/// Accepts a downloaded page only if it links at least one departure.
pub fn is_schedule_page(path: &Path) -> bool {
    match std::fs::read(path) {
        Ok(bytes) if !bytes.is_empty() => {
            let valid = SCHEDULE_ANCHOR.is_match(&String::from_utf8_lossy(&bytes));
            if !valid {
                debug!(?path, "page carries no schedule anchor");
            }
            valid
        }
        _ => false,
    }
}

#[cfg(test)]
pub(crate) fn departure_link(
    agency_id: &str,
    season: Season,
    day: DayType,
    direction: Direction,
    time: &str,
) -> String {
    format!(
        "<a href=\"horario-estimado?codLinea={agency_id}&amp;temporada={}&amp;servicio=12\
         &amp;tipodia={}&amp;sentido={}&amp;hora={time}\">{time}</a>\n",
        season.token(),
        day.token(),
        direction.number()
    )
}
