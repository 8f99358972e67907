//! Concurrent schedule fetching.
//!
//! Every (line, stop) pair of the network becomes one unit of work. A
//! fixed pool of workers drains a bounded queue of units; each worker
//! fetches (or reuses) the stop's schedule page and parses a timetable
//! from it. Units never share a page path and results are written back
//! through stop handles once the pool has drained, so workers need no
//! coordination beyond the queue.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tracing::{debug, info, trace, warn};

use super::error::ScheduleError;
use super::extract::{is_schedule_page, parse_timetable};
use super::season::{Season, season_at};
use crate::builder::decode;
use crate::config::DigestConfig;
use crate::domain::{Direction, StopHandle, Timetable, TransitNetwork};
use crate::fetch::Fetcher;
use crate::source::{SourceKind, TOKEN_LINE, TOKEN_NUMBER, TOKEN_SEASON, TOKEN_STOP, TransitSource};

/// Lifecycle of one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Pending,
    Fetching,
    Fetched,
    Failed,
}

impl UnitState {
    pub fn is_terminal(self) -> bool {
        matches!(self, UnitState::Fetched | UnitState::Failed)
    }
}

/// Schedule page of one stop of one line.
#[derive(Debug, Clone)]
pub struct ScheduleUnit {
    /// Every stop entry this page fills. More than one only when a line
    /// keeps duplicated stops.
    pub handles: Vec<StopHandle>,
    pub line_id: String,
    pub agency_id: String,
    pub direction: Direction,
    pub stop_id: String,
    pub uri: String,
    pub page: PathBuf,
}

/// File name of a stop's schedule page inside the source directory.
pub fn page_file_name(line_id: &str, stop_id: &str) -> String {
    format!("sched_{line_id}_{stop_id}.html")
}

/// Enumerate the units for every stop of every line, one per page path.
pub fn plan_units(network: &TransitNetwork, source: &TransitSource, season: Season) -> Vec<ScheduleUnit> {
    let mut units: Vec<ScheduleUnit> = Vec::new();
    let mut by_page: HashMap<PathBuf, usize> = HashMap::new();

    for handle in network.stop_handles() {
        let line = &network.lines[handle.line];
        let stop = &line.stops[handle.stop];
        let page = source.page_path(&page_file_name(&line.id, &stop.id));

        if let Some(&i) = by_page.get(&page) {
            units[i].handles.push(handle);
            continue;
        }

        let number = line.number.to_string();
        let uri = source.address(&[
            (TOKEN_LINE, &line.agency_id),
            (TOKEN_NUMBER, &number),
            (TOKEN_STOP, &stop.id),
            (TOKEN_SEASON, season.token()),
        ]);
        by_page.insert(page.clone(), units.len());
        units.push(ScheduleUnit {
            handles: vec![handle],
            line_id: line.id.clone(),
            agency_id: line.agency_id.clone(),
            direction: line.direction,
            stop_id: stop.id.clone(),
            uri,
            page,
        });
    }
    units
}

/// Outcome of a schedule stage run.
#[derive(Debug, Clone, Default)]
pub struct ScheduleReport {
    /// Final state of each unit, in plan order.
    pub states: Vec<UnitState>,
    /// Number of (unit, day type) pairs whose page listed no departures.
    pub missing_days: usize,
}

impl ScheduleReport {
    pub fn total(&self) -> usize {
        self.states.len()
    }

    pub fn fetched(&self) -> usize {
        self.states.iter().filter(|s| **s == UnitState::Fetched).count()
    }

    pub fn failed(&self) -> usize {
        self.states.iter().filter(|s| **s == UnitState::Failed).count()
    }
}

/// Settings the workers share.
struct WorkerContext<'a, F> {
    fetcher: &'a F,
    season: Season,
    reuse_cached: bool,
}

impl<F> Clone for WorkerContext<'_, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F> Copy for WorkerContext<'_, F> {}

/// Fill the timetable of every stop in the network from a `Schedule`
/// source.
///
/// Fails only when the source is of the wrong kind or the season cannot
/// be determined; per-unit failures are logged and leave that stop's
/// timetable empty.
pub async fn fetch_schedules<F: Fetcher>(
    network: &mut TransitNetwork,
    source: &TransitSource,
    config: &DigestConfig,
    now: DateTime<Utc>,
    fetcher: &F,
) -> Result<ScheduleReport, ScheduleError> {
    match source.kind() {
        Ok(SourceKind::Schedule) => {}
        Ok(kind) => return Err(ScheduleError::WrongKind(kind)),
        Err(e) => return Err(ScheduleError::UnsupportedSource(e.0)),
    }
    let season = season_at(config.summer_window.as_ref(), now)?;

    let units = plan_units(network, source, season);
    info!(units = units.len(), pool = config.pool_size, %season, "fetching schedules");

    let context = WorkerContext {
        fetcher,
        season,
        reuse_cached: config.reuse_cached,
    };
    let (states, outcomes) = run_pool(&units, config.pool_size, context).await;

    let mut report = ScheduleReport {
        states,
        missing_days: 0,
    };
    for (index, outcome) in outcomes {
        let unit = &units[index];
        match outcome {
            Ok((timetable, missing)) => {
                report.missing_days += missing;
                for handle in &unit.handles {
                    if let Some(stop) = network.stop_mut(*handle) {
                        stop.schedule = timetable.clone();
                    }
                }
            }
            Err(e) => {
                warn!(line = %unit.line_id, stop = %unit.stop_id, error = %e, "schedule not fetched");
            }
        }
    }

    info!(
        fetched = report.fetched(),
        failed = report.failed(),
        missing_days = report.missing_days,
        "schedules done"
    );
    Ok(report)
}

type UnitOutcome = (usize, Result<(Timetable, usize), ScheduleError>);

/// Run the units through `pool_size` workers and wait for all of them.
///
/// Returns the final state of every unit alongside the outcomes.
async fn run_pool<F: Fetcher>(
    units: &[ScheduleUnit],
    pool_size: usize,
    context: WorkerContext<'_, F>,
) -> (Vec<UnitState>, Vec<UnitOutcome>) {
    let pool_size = pool_size.max(1);
    let (tx, rx) = mpsc::channel::<usize>(pool_size);
    let rx = Arc::new(AsyncMutex::new(rx));
    let states = Mutex::new(vec![UnitState::Pending; units.len()]);
    let set_state = |index: usize, state: UnitState| {
        if let Ok(mut states) = states.lock() {
            states[index] = state;
        }
    };

    let producer = async move {
        for index in 0..units.len() {
            if tx.send(index).await.is_err() {
                break;
            }
        }
    };

    let workers = (0..pool_size).map(|worker| {
        let rx = Arc::clone(&rx);
        let set_state = &set_state;
        async move {
            let mut outcomes = Vec::new();
            loop {
                let next = rx.lock().await.recv().await;
                let Some(index) = next else { break };
                let unit = &units[index];

                set_state(index, UnitState::Fetching);
                trace!(worker, line = %unit.line_id, stop = %unit.stop_id, "unit started");
                let outcome = run_unit(unit, context).await;
                set_state(
                    index,
                    if outcome.is_ok() {
                        UnitState::Fetched
                    } else {
                        UnitState::Failed
                    },
                );
                outcomes.push((index, outcome));
            }
            outcomes
        }
    });

    let ((), per_worker) = tokio::join!(producer, join_all(workers));
    let states = states.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
    (states, per_worker.into_iter().flatten().collect())
}

async fn run_unit<F: Fetcher>(
    unit: &ScheduleUnit,
    context: WorkerContext<'_, F>,
) -> Result<(Timetable, usize), ScheduleError> {
    let cached = context.reuse_cached && is_schedule_page(&unit.page);
    if cached {
        debug!(line = %unit.line_id, stop = %unit.stop_id, "reusing schedule page");
    } else {
        context
            .fetcher
            .fetch(&unit.uri, &unit.page, is_schedule_page)
            .await?;
    }

    let bytes = tokio::fs::read(&unit.page)
        .await
        .map_err(|source| ScheduleError::Io {
            path: unit.page.clone(),
            source,
        })?;
    let (timetable, missing) =
        parse_timetable(&decode(&bytes), &unit.agency_id, context.season, unit.direction)?;
    for day in &missing {
        debug!(line = %unit.line_id, stop = %unit.stop_id, %day, season = %context.season, "no departures");
    }
    Ok((timetable, missing.len()))
}
