//! Per-run mutable state shared by the builder stages.
//!
//! Owned by the orchestrator and lent to each stage, so nothing leaks
//! between runs and tests can build networks side by side.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::config::DigestConfig;
use crate::domain::{Direction, Stop};

/// Base of synthetic line numbers; the first one handed out is base + 1.
pub const GENERATED_NUMBER_BASE: u32 = 9000;

/// Assigns numeric line numbers to agency ids.
#[derive(Debug, Clone, Default)]
pub struct LineNumbers {
    overrides: HashMap<String, u32>,
    generated: HashMap<String, u32>,
    next_ordinal: u32,
}

impl LineNumbers {
    pub fn new(overrides: HashMap<String, u32>) -> Self {
        Self {
            overrides,
            ..Self::default()
        }
    }

    /// Number for an agency id.
    ///
    /// Numeric ids are their own number. Otherwise the configured override
    /// wins, and failing that a synthetic number is generated once and
    /// reused for every later appearance of the same id.
    pub fn number_for(&mut self, agency_id: &str) -> u32 {
        if let Ok(n) = agency_id.trim().parse::<u32>() {
            return n;
        }
        if let Some(&n) = self.overrides.get(agency_id) {
            return n;
        }
        let next_ordinal = &mut self.next_ordinal;
        *self
            .generated
            .entry(agency_id.to_string())
            .or_insert_with(|| {
                *next_ordinal += 1;
                let n = GENERATED_NUMBER_BASE + *next_ordinal;
                debug!(agency_id, number = n, "generated line number");
                n
            })
    }
}

/// State carried across the builder stages of one digestion run.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub numbers: LineNumbers,
    stop_cache: HashMap<(String, Direction), Vec<Stop>>,
    ignored: HashSet<String>,
}

impl RunState {
    pub fn new(config: &DigestConfig) -> Self {
        Self {
            numbers: LineNumbers::new(config.line_numbers.clone()),
            stop_cache: HashMap::new(),
            ignored: config.ignored_lines.clone(),
        }
    }

    /// True if this agency id is excluded from the run.
    pub fn is_ignored(&self, agency_id: &str) -> bool {
        self.ignored.contains(agency_id)
    }

    /// Keep the stops scraped for a direction not being built right now.
    pub fn cache_stops(&mut self, agency_id: &str, direction: Direction, stops: Vec<Stop>) {
        self.stop_cache
            .insert((agency_id.to_string(), direction), stops);
    }

    /// Take previously cached stops for a line direction, if any.
    pub fn take_cached_stops(&mut self, agency_id: &str, direction: Direction) -> Option<Vec<Stop>> {
        self.stop_cache.remove(&(agency_id.to_string(), direction))
    }
}
