//! Run-wide configuration for a digestion pass.
//!
//! Values come from environment-style toggles. [`DigestConfig::from_lookup`]
//! takes any key lookup so tests never have to touch the process
//! environment.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, Utc};

/// Default schedule worker pool size.
pub const DEFAULT_POOL_SIZE: usize = 5;

/// Default number of attempts per download.
pub const DEFAULT_MAX_DOWNLOAD_ATTEMPTS: u32 = 10;

/// Default request timeout for downloads, in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Default reserved prefix of night line agency ids.
pub const DEFAULT_NIGHT_PREFIX: &str = "G";

pub const ENV_REUSE_LOCAL_DATA: &str = "TRANSIT_REUSE_LOCAL_DATA";
pub const ENV_REMOVE_DUPLICATED_STOPS: &str = "TRANSIT_REMOVE_DUPLICATED_STOPS";
pub const ENV_IGNORED_LINES: &str = "TRANSIT_IGNORED_LINES";
pub const ENV_SUMMER_START: &str = "TRANSIT_SUMMER_START";
pub const ENV_SUMMER_END: &str = "TRANSIT_SUMMER_END";
pub const ENV_LINE_NUMBERS: &str = "TRANSIT_LINE_NUMBERS";
pub const ENV_LINE_NAMES: &str = "TRANSIT_LINE_NAMES";
pub const ENV_NIGHT_PREFIX: &str = "TRANSIT_NIGHT_PREFIX";
pub const ENV_POOL_SIZE: &str = "TRANSIT_POOL_SIZE";
pub const ENV_MAX_DOWNLOAD_ATTEMPTS: &str = "TRANSIT_MAX_DOWNLOAD_ATTEMPTS";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "TRANSIT_FETCH_TIMEOUT_SECS";
pub const ENV_SOURCES: &str = "TRANSIT_SOURCES";
pub const ENV_OUTPUT_DIR: &str = "TRANSIT_OUTPUT_DIR";

/// Errors while reading configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A value is present but cannot be parsed
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// Only one end of the summer window is configured
    #[error("summer window needs both a start and an end")]
    IncompleteSummerWindow,

    /// The source catalogue cannot be read or parsed
    #[error("source catalogue {path:?}: {message}")]
    Catalogue { path: PathBuf, message: String },
}

/// The date range in which the summer timetable applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummerWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl SummerWindow {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        Self { start, end }
    }

    /// Parse both ends from RFC 3339 text.
    pub fn parse(start: &str, end: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            start: parse_timestamp(ENV_SUMMER_START, start)?,
            end: parse_timestamp(ENV_SUMMER_END, end)?,
        })
    }

    /// True if `now` falls inside the window, both ends included.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        now >= self.start.with_timezone(&Utc) && now <= self.end.with_timezone(&Utc)
    }
}

/// Configuration shared by every stage of one digestion run.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// Reuse local artifacts instead of downloading them again.
    pub reuse_cached: bool,

    /// Keep only the first occurrence of a stop id within a line direction.
    pub remove_duplicated_stops: bool,

    /// Agency line ids left out of the network entirely.
    pub ignored_lines: HashSet<String>,

    /// Summer timetable window; schedules cannot be dated without it.
    pub summer_window: Option<SummerWindow>,

    /// Numbers for agency ids that are not numeric.
    pub line_numbers: HashMap<String, u32>,

    /// Expected forward names, by agency id, that replace published ones.
    pub line_names: HashMap<String, String>,

    /// Agency ids starting with this prefix are night lines.
    pub night_prefix: String,

    /// Schedule worker pool size.
    pub pool_size: usize,

    /// Attempts per download before giving up.
    pub max_download_attempts: u32,

    /// Request timeout per download attempt, in seconds.
    pub fetch_timeout_secs: u64,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            reuse_cached: false,
            remove_duplicated_stops: false,
            ignored_lines: HashSet::new(),
            summer_window: None,
            line_numbers: HashMap::new(),
            line_names: HashMap::new(),
            night_prefix: DEFAULT_NIGHT_PREFIX.to_string(),
            pool_size: DEFAULT_POOL_SIZE,
            max_download_attempts: DEFAULT_MAX_DOWNLOAD_ATTEMPTS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

impl DigestConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    ///
    /// Missing keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = get(ENV_REUSE_LOCAL_DATA) {
            config.reuse_cached = parse_bool(ENV_REUSE_LOCAL_DATA, &v)?;
        }
        if let Some(v) = get(ENV_REMOVE_DUPLICATED_STOPS) {
            config.remove_duplicated_stops = parse_bool(ENV_REMOVE_DUPLICATED_STOPS, &v)?;
        }
        if let Some(v) = get(ENV_IGNORED_LINES) {
            config.ignored_lines = split_list(&v).map(str::to_string).collect();
        }
        config.summer_window = match (get(ENV_SUMMER_START), get(ENV_SUMMER_END)) {
            (Some(start), Some(end)) => Some(SummerWindow::parse(&start, &end)?),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteSummerWindow),
        };
        if let Some(v) = get(ENV_LINE_NUMBERS) {
            for (id, number) in parse_pairs(ENV_LINE_NUMBERS, &v)? {
                let number = number.parse().map_err(|e: std::num::ParseIntError| {
                    ConfigError::Invalid {
                        key: ENV_LINE_NUMBERS,
                        value: v.clone(),
                        reason: e.to_string(),
                    }
                })?;
                config.line_numbers.insert(id, number);
            }
        }
        if let Some(v) = get(ENV_LINE_NAMES) {
            config.line_names = parse_pairs(ENV_LINE_NAMES, &v)?.into_iter().collect();
        }
        if let Some(v) = get(ENV_NIGHT_PREFIX) {
            config.night_prefix = v.trim().to_string();
        }
        if let Some(v) = get(ENV_POOL_SIZE) {
            config.pool_size = parse_positive(ENV_POOL_SIZE, &v)?;
        }
        if let Some(v) = get(ENV_MAX_DOWNLOAD_ATTEMPTS) {
            config.max_download_attempts = parse_positive(ENV_MAX_DOWNLOAD_ATTEMPTS, &v)?;
        }
        if let Some(v) = get(ENV_FETCH_TIMEOUT_SECS) {
            config.fetch_timeout_secs = parse_positive(ENV_FETCH_TIMEOUT_SECS, &v)?;
        }

        Ok(config)
    }

    /// Enable or disable reuse of local artifacts.
    pub fn with_reuse_cached(mut self, reuse: bool) -> Self {
        self.reuse_cached = reuse;
        self
    }

    /// Set the duplicate stop policy.
    pub fn with_remove_duplicated_stops(mut self, remove: bool) -> Self {
        self.remove_duplicated_stops = remove;
        self
    }

    /// Exclude an agency line id.
    pub fn with_ignored_line(mut self, agency_id: impl Into<String>) -> Self {
        self.ignored_lines.insert(agency_id.into());
        self
    }

    /// Set the summer window.
    pub fn with_summer_window(mut self, window: SummerWindow) -> Self {
        self.summer_window = Some(window);
        self
    }

    /// Register an expected forward name for an agency id.
    pub fn with_line_name(mut self, agency_id: impl Into<String>, name: impl Into<String>) -> Self {
        self.line_names.insert(agency_id.into(), name.into());
        self
    }

    /// Set the schedule worker pool size.
    pub fn with_pool_size(mut self, n: usize) -> Self {
        self.pool_size = n;
        self
    }

    /// True if this agency id carries the night prefix.
    pub fn is_night_id(&self, agency_id: &str) -> bool {
        !self.night_prefix.is_empty() && agency_id.starts_with(&self.night_prefix)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Ok(true),
        "0" | "f" | "false" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

fn parse_positive<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
{
    match value.trim().parse::<T>() {
        Ok(n) if n != T::default() => Ok(n),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "expected a positive integer".to_string(),
        }),
    }
}

fn parse_timestamp(key: &'static str, value: &str) -> Result<DateTime<FixedOffset>, ConfigError> {
    DateTime::parse_from_rfc3339(value.trim()).map_err(|e| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Parse `a=1,b=2` into pairs.
fn parse_pairs(key: &'static str, value: &str) -> Result<Vec<(String, String)>, ConfigError> {
    split_list(value)
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .filter(|(k, v)| !k.is_empty() && !v.is_empty())
                .ok_or_else(|| ConfigError::Invalid {
                    key,
                    value: value.to_string(),
                    reason: format!("expected id=value, got {pair:?}"),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = DigestConfig::from_lookup(|_| None).unwrap();
        assert!(!config.reuse_cached);
        assert!(!config.remove_duplicated_stops);
        assert!(config.ignored_lines.is_empty());
        assert!(config.summer_window.is_none());
        assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(config.max_download_attempts, DEFAULT_MAX_DOWNLOAD_ATTEMPTS);
        assert_eq!(config.fetch_timeout_secs, DEFAULT_FETCH_TIMEOUT_SECS);
        assert_eq!(config.night_prefix, "G");
    }

    #[test]
    fn reads_every_toggle() {
        let config = DigestConfig::from_lookup(lookup(&[
            (ENV_REUSE_LOCAL_DATA, "true"),
            (ENV_REMOVE_DUPLICATED_STOPS, "1"),
            (ENV_IGNORED_LINES, "A7, 99 ,"),
            (ENV_SUMMER_START, "2024-06-24T00:00:00+02:00"),
            (ENV_SUMMER_END, "2024-09-08T23:59:59+02:00"),
            (ENV_LINE_NUMBERS, "A3=903,G1=901"),
            (ENV_LINE_NAMES, "01=MOON - URANUS"),
            (ENV_POOL_SIZE, "8"),
            (ENV_MAX_DOWNLOAD_ATTEMPTS, "3"),
            (ENV_FETCH_TIMEOUT_SECS, "12"),
        ]))
        .unwrap();

        assert!(config.reuse_cached);
        assert!(config.remove_duplicated_stops);
        assert!(config.ignored_lines.contains("A7"));
        assert!(config.ignored_lines.contains("99"));
        assert_eq!(config.ignored_lines.len(), 2);
        assert_eq!(config.line_numbers.get("A3"), Some(&903));
        assert_eq!(config.line_names.get("01").map(String::as_str), Some("MOON - URANUS"));
        assert_eq!(config.pool_size, 8);
        assert_eq!(config.max_download_attempts, 3);
        assert_eq!(config.fetch_timeout_secs, 12);
        assert!(config.summer_window.is_some());
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(matches!(
            DigestConfig::from_lookup(lookup(&[(ENV_REUSE_LOCAL_DATA, "maybe")])),
            Err(ConfigError::Invalid { key: ENV_REUSE_LOCAL_DATA, .. })
        ));
        assert!(matches!(
            DigestConfig::from_lookup(lookup(&[(ENV_POOL_SIZE, "0")])),
            Err(ConfigError::Invalid { key: ENV_POOL_SIZE, .. })
        ));
        assert!(matches!(
            DigestConfig::from_lookup(lookup(&[(ENV_LINE_NUMBERS, "A3")])),
            Err(ConfigError::Invalid { key: ENV_LINE_NUMBERS, .. })
        ));
        assert_eq!(
            DigestConfig::from_lookup(lookup(&[(ENV_SUMMER_START, "2024-06-24T00:00:00Z")]))
                .unwrap_err(),
            ConfigError::IncompleteSummerWindow
        );
    }

    #[test]
    fn summer_window_bounds() {
        let window = SummerWindow::parse("2024-06-24T00:00:00Z", "2024-09-08T00:00:00Z").unwrap();
        let inside = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 9, 8, 0, 0, 1).unwrap();
        let edge = Utc.with_ymd_and_hms(2024, 6, 24, 0, 0, 0).unwrap();

        assert!(window.contains(inside));
        assert!(window.contains(edge));
        assert!(!window.contains(before));
        assert!(!window.contains(after));
    }

    #[test]
    fn night_prefix_matching() {
        let config = DigestConfig::default();
        assert!(config.is_night_id("G1"));
        assert!(!config.is_night_id("03"));
    }
}
