//! Stop Builder: scrapes per-line pages into ordered stop lists.
//!
//! A line page carries the stops of both directions. Stop names, ids,
//! map positions and connection blocks are matched independently and
//! zipped together by position, so all four must agree in count.
//! Whichever direction is not being built is cached in the run state,
//! and the line for that direction never fetches the page again.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;
use tracing::{debug, info, warn};

use super::error::BuildError;
use super::state::RunState;
use super::text::decode;
use crate::config::DigestConfig;
use crate::domain::{Coordinates, Direction, Line, Stop};
use crate::fetch::{Fetcher, is_non_empty_file};
use crate::source::{SourceKind, TOKEN_LINE, TOKEN_NUMBER, TransitSource};

/// Tag of forward stop blocks.
const FORWARD_TAG: &str = "IDA";
/// Tag of backward stop blocks.
const BACKWARD_TAG: &str = "VUELTA";

static STOP_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)<td headers="parada_([^"]*)"><span.*</span>(.*)</td>"#).expect("valid regex")
});
static STOP_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"codLinea=.{1,3}&amp;temporada=.{1,2}&amp;parada=([^"&]*)""#).expect("valid regex")
});
static STOP_POSITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"href="https://maps\.google\.com/\?q=([^,"]*),([^"]*)""#).expect("valid regex")
});
static CONNECTION_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<td headers="correspondencias_(?:ida|vuelta) correspondencia_parada">(.*?)</td>"#,
    )
    .expect("valid regex")
});
static CONNECTION_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"ntido=[12]">\s*([^\s<]+)\s*</a>"#).expect("valid regex")
});

/// File name of a line's stop page inside the source directory.
pub fn page_file_name(agency_id: &str) -> String {
    format!("line_stops_{agency_id}.html")
}

/// Direction named by a stop block tag.
fn direction_from_tag(tag: &str) -> Result<Direction, BuildError> {
    match tag.trim().to_uppercase().as_str() {
        FORWARD_TAG => Ok(Direction::Forward),
        BACKWARD_TAG => Ok(Direction::Backward),
        _ => Err(BuildError::UnknownDirectionTag(tag.to_string())),
    }
}

/// Decode HTML entities and drop any markup left in a scraped field.
fn decode_entities(raw: &str) -> String {
    Html::parse_fragment(raw)
        .root_element()
        .text()
        .collect::<String>()
        .trim()
        .to_string()
}

/// Bare line codes listed in a connection block, minus ignored ids.
fn connection_codes(block: &str, state: &RunState) -> Vec<String> {
    CONNECTION_CODE
        .captures_iter(block)
        .map(|c| c[1].to_string())
        .filter(|code| !state.is_ignored(code))
        .collect()
}

/// Stops of both directions scraped from one line page.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineStops {
    pub forward: Vec<Stop>,
    pub backward: Vec<Stop>,
}

impl LineStops {
    /// Split into (stops for `direction`, stops for the opposite one).
    fn split(self, direction: Direction) -> (Vec<Stop>, Vec<Stop>) {
        match direction {
            Direction::Forward => (self.forward, self.backward),
            Direction::Backward => (self.backward, self.forward),
        }
    }
}

/// Scrape a line page into forward and backward stop lists.
pub fn parse_line_page(
    html: &str,
    page: &Path,
    config: &DigestConfig,
    state: &RunState,
) -> Result<LineStops, BuildError> {
    let names: Vec<_> = STOP_NAME.captures_iter(html).collect();
    let ids: Vec<_> = STOP_ID.captures_iter(html).collect();
    let positions: Vec<_> = STOP_POSITION.captures_iter(html).collect();
    let connections: Vec<_> = CONNECTION_BLOCK.captures_iter(html).collect();

    if names.is_empty() {
        return Err(BuildError::NoStops(page.to_path_buf()));
    }
    if ids.len() != names.len()
        || positions.len() != names.len()
        || connections.len() != names.len()
    {
        return Err(BuildError::InconsistentExtraction {
            page: page.to_path_buf(),
            names: names.len(),
            ids: ids.len(),
            positions: positions.len(),
            connections: connections.len(),
        });
    }

    let mut stops = LineStops::default();
    for (((name, id), position), block) in names.iter().zip(&ids).zip(&positions).zip(&connections) {
        let direction = direction_from_tag(&name[1])?;
        let stop = Stop::new(id[1].trim(), decode_entities(&name[2]))
            .with_connections(connection_codes(&block[1], state))
            .with_location(Coordinates::new(position[1].trim(), position[2].trim()));

        let list = match direction {
            Direction::Forward => &mut stops.forward,
            Direction::Backward => &mut stops.backward,
        };
        if list.iter().any(|s| s.id == stop.id) && config.remove_duplicated_stops {
            debug!(?page, stop = %stop.id, %direction, "duplicated stop dropped");
            continue;
        }
        list.push(stop);
    }

    debug!(
        ?page,
        forward = stops.forward.len(),
        backward = stops.backward.len(),
        "scraped line page"
    );
    Ok(stops)
}

/// Fill every line's stops from a `Stops` source.
///
/// Lines whose page cannot be fetched or scraped keep no stops and are
/// reported by the consistency check later. Returns the number of lines
/// that received stops.
pub async fn build_stops<F: Fetcher>(
    lines: &mut [Line],
    source: &TransitSource,
    config: &DigestConfig,
    state: &mut RunState,
    fetcher: &F,
) -> Result<usize, BuildError> {
    match source.kind() {
        Ok(SourceKind::Stops) => {}
        Ok(kind) => {
            return Err(BuildError::WrongKind {
                stage: "stop builder",
                kind,
            });
        }
        Err(e) => return Err(BuildError::UnsupportedSource(e.0)),
    }

    let mut filled = 0;
    for line in lines.iter_mut() {
        let stops = match state.take_cached_stops(&line.agency_id, line.direction) {
            Some(stops) => {
                debug!(line = %line.id, "stops served from cache");
                stops
            }
            None => match fetch_line_stops(line, source, config, state, fetcher).await {
                Ok(scraped) => {
                    let (own, opposite) = scraped.split(line.direction);
                    state.cache_stops(&line.agency_id, line.direction.opposite(), opposite);
                    own
                }
                Err(e) => {
                    warn!(line = %line.id, error = %e, "stops not built");
                    continue;
                }
            },
        };

        line.stops = stops;
        line.refresh_map_route();
        filled += 1;
    }

    info!(lines = filled, "built stops");
    Ok(filled)
}

async fn fetch_line_stops<F: Fetcher>(
    line: &Line,
    source: &TransitSource,
    config: &DigestConfig,
    state: &RunState,
    fetcher: &F,
) -> Result<LineStops, BuildError> {
    let page = source.page_path(&page_file_name(&line.agency_id));

    if !(config.reuse_cached && is_non_empty_file(&page)) {
        let number = line.number.to_string();
        let uri = source.address(&[(TOKEN_LINE, &line.agency_id), (TOKEN_NUMBER, &number)]);
        debug!(line = %line.id, %uri, "fetching stop page");
        fetcher.fetch(&uri, &page, is_non_empty_file).await?;
    }

    let bytes = tokio::fs::read(&page)
        .await
        .map_err(|e| BuildError::io(&page, e))?;
    parse_line_page(&decode(&bytes), &page, config, state)
}
