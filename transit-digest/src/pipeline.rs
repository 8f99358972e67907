//! Pipeline Orchestrator: routes each declared source to its stage.
//!
//! A [`Digester`] owns everything one run mutates: the network under
//! construction and the builder state. Sources are processed in catalogue
//! order, and [`Digester::finish`] runs the passes that need every line:
//! name remediation, connection decoration and stop extraction.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::builder::{
    BuildError, ConnectionReport, RunState, build_line_summaries, build_lines, build_locations, build_stops,
    decorate_connections, remediate_line_name,
};
use crate::config::DigestConfig;
use crate::domain::{Line, NetworkVersion, TransitNetwork};
use crate::error::DigestError;
use crate::fetch::{Fetcher, is_non_empty_file};
use crate::schedule::fetch_schedules;
use crate::source::{SourceKind, TransitSource};
use crate::validate::check_consistency;

/// Accumulates one digestion run.
pub struct Digester<F> {
    config: DigestConfig,
    state: RunState,
    network: TransitNetwork,
    fetcher: F,
    now: DateTime<Utc>,
    day_lines_seen: bool,
    night_lines_seen: bool,
}

impl<F: Fetcher> Digester<F> {
    /// Start a run dated now.
    pub fn new(config: DigestConfig, fetcher: F) -> Self {
        Self {
            state: RunState::new(&config),
            config,
            network: TransitNetwork::new(),
            fetcher,
            now: Utc::now(),
            day_lines_seen: false,
            night_lines_seen: false,
        }
    }

    /// Date the run at `now`; decides the season and the version stamp.
    pub fn with_reference_time(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// The network built so far.
    pub fn network(&self) -> &TransitNetwork {
        &self.network
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Digest one source into the network.
    pub async fn process(&mut self, source: &TransitSource) -> Result<(), DigestError> {
        let kind = source
            .kind()
            .map_err(|e| BuildError::UnsupportedSource(e.0))?;
        debug!(source = %source.id, path = ?source.path, "processing source");

        match kind {
            SourceKind::Lines | SourceKind::AgencyLines => {
                let lines = build_lines(source, &self.config, &mut self.state)?;
                self.add_lines(lines);
            }
            SourceKind::Stops => {
                build_stops(
                    &mut self.network.lines,
                    source,
                    &self.config,
                    &mut self.state,
                    &self.fetcher,
                )
                .await?;
            }
            SourceKind::Location => {
                build_locations(&mut self.network.lines, source)?;
            }
            SourceKind::Schedule => {
                fetch_schedules(
                    &mut self.network,
                    source,
                    &self.config,
                    self.now,
                    &self.fetcher,
                )
                .await?;
            }
            SourceKind::DayLines => {
                self.network.day_lines = build_line_summaries(source, &mut self.state)?;
                self.day_lines_seen = true;
            }
            SourceKind::NightLines => {
                self.network.night_lines = build_line_summaries(source, &mut self.state)?;
                self.night_lines_seen = true;
            }
        }

        self.tag_night_lines_when_ready();
        Ok(())
    }

    /// Digest sources in order.
    ///
    /// A failing source is logged and skipped unless its error is fatal to
    /// the run.
    pub async fn process_all(&mut self, sources: &[TransitSource]) -> Result<(), DigestError> {
        for source in sources {
            match self.process(source).await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(source = %source.id, path = ?source.path, error = %e, "source skipped"),
            }
        }
        Ok(())
    }

    fn add_lines(&mut self, lines: Vec<Line>) {
        for line in lines {
            match self.network.lines.iter_mut().find(|l| l.id == line.id) {
                Some(existing) => {
                    warn!(line = %line.id, "line declared twice; replaced");
                    *existing = line;
                }
                None => self.network.lines.push(line),
            }
        }
    }

    /// Night tagging by number needs both enumerations and some lines.
    fn tag_night_lines_when_ready(&mut self) {
        if self.day_lines_seen && self.night_lines_seen && !self.network.lines.is_empty() {
            let tagged = self.network.tag_night_lines();
            if tagged > 0 {
                info!(tagged, "tagged night lines");
            }
        }
    }

    /// Run the passes that need the complete line set and return the
    /// network.
    pub fn finish(self) -> TransitNetwork {
        self.finish_with_report().0
    }

    /// Like [`Digester::finish`], also returning how connection codes
    /// were resolved.
    pub fn finish_with_report(mut self) -> (TransitNetwork, ConnectionReport) {
        let mut names: Vec<_> = self.config.line_names.iter().collect();
        names.sort();
        for (agency_id, expected) in names {
            if let Err(e) = remediate_line_name(&mut self.network.lines, agency_id, expected) {
                warn!(error = %e, "line name not remediated");
            }
        }

        let connections = decorate_connections(&mut self.network.lines);
        self.network.extract_stops();
        self.network.version = Some(NetworkVersion::at(self.now));

        info!(
            lines = self.network.lines.len(),
            stops = self.network.stops.len(),
            "network finished"
        );
        (self.network, connections)
    }
}

/// Digest a catalogue end to end and check the result.
pub async fn digest<F: Fetcher>(
    sources: &[TransitSource],
    config: DigestConfig,
    fetcher: F,
    now: DateTime<Utc>,
) -> Result<TransitNetwork, DigestError> {
    let mut digester = Digester::new(config, fetcher).with_reference_time(now);
    digester.process_all(sources).await?;
    let network = digester.finish();

    let report = check_consistency(&network)?;
    debug!("{report}");
    Ok(network)
}

/// Download every source that is fetched whole rather than page by page.
///
/// With cached reuse enabled, non-empty local copies are left alone.
/// Failures are logged; the stage digesting that source reports the
/// missing file later. Returns the number of downloads made.
pub async fn prefetch_sources<F: Fetcher>(
    sources: &[TransitSource],
    config: &DigestConfig,
    fetcher: &F,
) -> usize {
    let mut fetched = 0;
    for source in sources {
        match source.kind() {
            Ok(kind) if kind.is_templated() => continue,
            Ok(_) => {}
            Err(e) => {
                warn!(source = %source.id, error = %e, "not downloaded");
                continue;
            }
        }
        if config.reuse_cached && is_non_empty_file(&source.path) {
            debug!(source = %source.id, path = ?source.path, "reusing local copy");
            continue;
        }
        match fetcher
            .fetch(&source.uri, &source.path, is_non_empty_file)
            .await
        {
            Ok(()) => fetched += 1,
            Err(e) => warn!(source = %source.id, uri = %source.uri, error = %e, "download failed"),
        }
    }
    info!(fetched, "sources downloaded");
    fetched
}
