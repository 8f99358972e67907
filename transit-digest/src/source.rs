//! Declared data sources and the source catalogue.
//!
//! The catalogue is a JSON array of `{ "id", "path", "uri" }` objects. The
//! `id` names the kind of data the source carries and decides which builder
//! stage digests it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Token replaced by the agency line id in page address templates.
pub const TOKEN_LINE: &str = "{line}";
/// Token replaced by the numeric line number.
pub const TOKEN_NUMBER: &str = "{number}";
/// Token replaced by the stop id.
pub const TOKEN_STOP: &str = "{stop}";
/// Token replaced by the season code.
pub const TOKEN_SEASON: &str = "{season}";

/// Kind of data a source carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Semicolon-separated rows of line, direction, order and stop
    Lines,
    /// Page listing every agency line as `<option>` entries
    AgencyLines,
    /// Per-line stop pages, addressed through a template
    Stops,
    /// GTFS archive carrying stop coordinates
    Location,
    /// Per-stop schedule pages, addressed through a template
    Schedule,
    /// Enumeration of day lines
    DayLines,
    /// Enumeration of night lines
    NightLines,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Lines => "Lines",
            SourceKind::AgencyLines => "AgencyLines",
            SourceKind::Stops => "Stops",
            SourceKind::Location => "Location",
            SourceKind::Schedule => "Schedule",
            SourceKind::DayLines => "DayLines",
            SourceKind::NightLines => "NightLines",
        }
    }

    /// True if the source is fetched page by page through its template
    /// rather than downloaded once.
    pub fn is_templated(self) -> bool {
        matches!(self, SourceKind::Stops | SourceKind::Schedule)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for a source id naming no known kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported source kind: {0}")]
pub struct UnknownSourceKind(pub String);

impl FromStr for SourceKind {
    type Err = UnknownSourceKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lines" => Ok(SourceKind::Lines),
            "agencylines" => Ok(SourceKind::AgencyLines),
            "stops" => Ok(SourceKind::Stops),
            "location" => Ok(SourceKind::Location),
            "schedule" => Ok(SourceKind::Schedule),
            "daylines" => Ok(SourceKind::DayLines),
            "nightlines" => Ok(SourceKind::NightLines),
            _ => Err(UnknownSourceKind(s.to_string())),
        }
    }
}

/// A declared data source.
///
/// For templated kinds `path` is the directory holding the downloaded
/// pages; otherwise it is the local copy of `uri`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitSource {
    #[serde(alias = "Id")]
    pub id: String,
    #[serde(alias = "Path")]
    pub path: PathBuf,
    #[serde(alias = "Uri")]
    pub uri: String,
}

impl TransitSource {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>, uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            uri: uri.into(),
        }
    }

    /// The kind named by this source's id.
    pub fn kind(&self) -> Result<SourceKind, UnknownSourceKind> {
        self.id.parse()
    }

    /// Substitute `(token, value)` pairs into the address template.
    pub fn address(&self, substitutions: &[(&str, &str)]) -> String {
        substitutions
            .iter()
            .fold(self.uri.clone(), |uri, (token, value)| uri.replace(token, value))
    }

    /// Local file for a page of a templated source.
    pub fn page_path(&self, file_name: &str) -> PathBuf {
        self.path.join(file_name)
    }
}

/// Parse a catalogue document. Blank input is an empty catalogue.
pub fn parse_catalogue(json: &str) -> Result<Vec<TransitSource>, serde_json::Error> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(json)
}

/// Read and parse the catalogue file.
pub fn load_catalogue(path: &Path) -> Result<Vec<TransitSource>, ConfigError> {
    let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Catalogue {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_catalogue(&json).map_err(|e| ConfigError::Catalogue {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
