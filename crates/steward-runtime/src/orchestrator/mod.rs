//! The orchestrator: owns every component, runs the governance cycles, and
//! supervises them as workers.
//!
//! Data flows scanner -> monitor -> violation queue -> planner -> plan queue
//! -> executor, with the pattern detector feeding the same violation queue and
//! the SLO tracker closing the loop through emergency mode. Both queues are
//! bounded; producers block for at most one heartbeat and otherwise leave the
//! violation for the planner's backlog sweep.

mod cycles;
mod emergency;
mod quarantine;
mod workers;

pub use cycles::{CycleSummary, ScanCycleReport, SloCycleReport, ViolationDelta};
pub use emergency::emergency_triggers;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use rustc_hash::FxHashMap;
use steward_analysis::{CorpusScanner, PatternDetector, SimilarityPair, ThresholdMonitor};
use steward_core::constants::DATABASE_FILE;
use steward_core::errors::{ConfigError, ErrorClass, GovernanceError, SupervisionError};
use steward_core::events::EventDispatcher;
use steward_core::traits::{Cancellable, CancellationToken, Clock, NotificationSink, SystemClock};
use steward_core::types::{ActionPlan, FileMetric, Violation};
use steward_core::{AllowedRoots, StewardConfig};
use steward_remediation::{EmergencyLatch, Executor, RemediationPlanner};
use steward_storage::MetricStore;

use crate::event_log::EventLogHandler;
use crate::notify::{AlertRouter, JsonlFileSink, TracingSink};
use crate::reports::ReportSchedule;
use crate::slo::SloTracker;
use crate::supervisor::Supervisor;

pub const ALERTS_FILE: &str = "alerts.jsonl";

/// How a supervised run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Stop requested outside emergency mode.
    Stopped,
    /// Stop requested while emergency mode was active.
    EmergencyStop { reason: String },
    /// A worker hit an unrecoverable error.
    Fatal { worker: String, message: String },
}

impl RunOutcome {
    /// Process exit code: 0 normal, 1 fatal, 2 emergency shutdown.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Stopped => 0,
            Self::Fatal { .. } => 1,
            Self::EmergencyStop { .. } => 2,
        }
    }
}

/// Corpus view shared between the scanner and the planner.
#[derive(Debug, Default)]
struct CorpusState {
    pairs: Vec<SimilarityPair>,
    latest: Vec<FileMetric>,
}

pub struct Orchestrator {
    config: StewardConfig,
    results_root: PathBuf,
    store: Arc<MetricStore>,
    clock: Arc<dyn Clock>,
    events: EventDispatcher,
    scanner: Mutex<CorpusScanner>,
    monitor: ThresholdMonitor,
    detector: PatternDetector,
    planner: RemediationPlanner,
    executor: Executor,
    slo: SloTracker,
    supervisor: Supervisor,
    latch: EmergencyLatch,
    violation_tx: Sender<Violation>,
    violation_rx: Receiver<Violation>,
    plan_tx: Sender<ActionPlan>,
    plan_rx: Receiver<ActionPlan>,
    state: Mutex<CorpusState>,
    /// Violation id -> when it was last planned.
    planned: Mutex<FxHashMap<String, i64>>,
    /// Ready plans waiting for dispatch: emergency mode or a full plan queue.
    held: Mutex<Vec<ActionPlan>>,
    /// Path -> subject held back after corrupt state.
    quarantine: Mutex<FxHashMap<String, quarantine::Quarantined>>,
    announced: AtomicBool,
    escalated: AtomicBool,
    schedule: Mutex<ReportSchedule>,
    cycle_errors: AtomicU32,
}

impl Orchestrator {
    /// Open with the system clock, alerts to the log and `<results>/alerts.jsonl`.
    pub fn open(config: StewardConfig, base: &Path) -> Result<Self, GovernanceError> {
        let results_root = results_root(&config, base);
        let sinks: Vec<Arc<dyn NotificationSink>> = vec![
            Arc::new(TracingSink),
            Arc::new(JsonlFileSink::new(results_root.join(ALERTS_FILE))),
        ];
        Self::open_with(config, base, Arc::new(SystemClock), sinks)
    }

    pub fn open_with(
        config: StewardConfig,
        base: &Path,
        clock: Arc<dyn Clock>,
        sinks: Vec<Arc<dyn NotificationSink>>,
    ) -> Result<Self, GovernanceError> {
        let roots = AllowedRoots::new(base, &config.scan.effective_roots())?;
        let results_root = results_root(&config, base);
        roots.ensure_outside(&results_root)?;
        fs::create_dir_all(&results_root).map_err(|e| ConfigError::ValidationFailed {
            field: "orchestrator.results_root".to_string(),
            message: format!("{}: {e}", results_root.display()),
        })?;

        let store = Arc::new(MetricStore::open(&results_root.join(DATABASE_FILE), &config.storage)?);

        let mut events = EventDispatcher::new();
        events.register(Arc::new(EventLogHandler::new(Arc::clone(&store), Arc::clone(&clock))));
        events.register(Arc::new(AlertRouter::new(sinks)));

        let latch = EmergencyLatch::new();
        let scanner = CorpusScanner::new(roots.clone(), &config.scan)?;
        let executor = Executor::new(Arc::clone(&store), roots, &config, &results_root)
            .with_events(events.clone())
            .with_clock(Arc::clone(&clock))
            .with_latch(latch.clone());
        let slo = SloTracker::new(Arc::clone(&store), config.slo.clone()).with_events(events.clone());
        let heartbeat = Duration::from_secs(config.orchestrator.effective_heartbeat_interval_s());
        let supervisor = Supervisor::new(heartbeat, config.supervision.clone(), Arc::clone(&clock))
            .with_store(Arc::clone(&store))
            .with_events(events.clone());

        let capacity = config.orchestrator.effective_queue_capacity();
        let (violation_tx, violation_rx) = bounded(capacity);
        let (plan_tx, plan_rx) = bounded(capacity);
        let schedule = ReportSchedule::new(config.orchestrator.daily_report_time().unwrap_or((0, 0)));

        tracing::info!(results_root = %results_root.display(), "orchestrator opened");
        Ok(Self {
            monitor: ThresholdMonitor::new(config.thresholds.clone()),
            detector: PatternDetector::new(config.detector.clone(), config.thresholds.clone()),
            planner: RemediationPlanner::new(&config),
            scanner: Mutex::new(scanner),
            results_root,
            store,
            clock,
            events,
            executor,
            slo,
            supervisor,
            latch,
            violation_tx,
            violation_rx,
            plan_tx,
            plan_rx,
            state: Mutex::new(CorpusState::default()),
            planned: Mutex::new(FxHashMap::default()),
            held: Mutex::new(Vec::new()),
            quarantine: Mutex::new(FxHashMap::default()),
            announced: AtomicBool::new(false),
            escalated: AtomicBool::new(false),
            schedule: Mutex::new(schedule),
            cycle_errors: AtomicU32::new(0),
            config,
        })
    }

    pub fn config(&self) -> &StewardConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<MetricStore> {
        &self.store
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn results_root(&self) -> &Path {
        &self.results_root
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// One pass of every cycle on the calling thread, without queues.
    pub fn run_once(&self) -> Result<CycleSummary, GovernanceError> {
        let recovered = self.executor.recover_interrupted()?;
        let now = self.clock.now();
        let mut summary = CycleSummary {
            recovered: recovered.len(),
            ..CycleSummary::default()
        };

        let scan = self.scan_cycle(now)?;
        summary.files = scan.file_count;
        summary.opened += scan.opened.len();
        summary.closed += scan.closed;
        let predicted = self.detect_cycle(now)?;
        summary.opened += predicted.opened.len();
        summary.closed += predicted.closed;

        let mut candidates = scan.opened;
        candidates.extend(predicted.opened);
        candidates.extend(self.store.open_violations()?);
        if let Some(plan) = self.plan_cycle(candidates, now)? {
            summary.plans += 1;
            if let Some(plan) = self.dispatchable(plan) {
                summary.executed.push(self.execute(&plan)?);
            }
        }
        for plan in self.take_held() {
            summary.executed.push(self.execute(&plan)?);
        }

        let slo = self.slo_cycle(now)?;
        summary.health = Some(slo.health);
        summary.emergency = self.latch.reason();
        summary.reports = self.report_cycle(now)?;
        Ok(summary)
    }

    /// Supervise every worker until `stop` is cancelled or a worker fails fatally.
    ///
    /// Interrupted actions from a previous run are rolled back first. A worker
    /// whose restart budget runs out puts the orchestrator in emergency mode.
    pub fn run(self: &Arc<Self>, stop: &CancellationToken) -> Result<RunOutcome, GovernanceError> {
        let recovered = self.executor.recover_interrupted()?;
        if !recovered.is_empty() {
            tracing::warn!(count = recovered.len(), "rolled back interrupted actions");
        }
        for worker in workers::all(self) {
            self.supervisor.spawn(worker)?;
        }

        let pause = (self.supervisor.heartbeat_interval() / 2).clamp(Duration::from_millis(10), Duration::from_secs(1));
        let outcome = loop {
            if stop.is_cancelled() {
                break match self.latch.reason() {
                    Some(reason) => RunOutcome::EmergencyStop { reason },
                    None => RunOutcome::Stopped,
                };
            }
            let report = self.supervisor.check();
            if let Some((worker, message)) = report.fatal {
                break RunOutcome::Fatal { worker, message };
            }
            for exhausted in report.exhausted {
                self.enter_emergency(exhausted.to_string());
            }
            std::thread::sleep(pause);
        };

        tracing::info!(?outcome, "shutting down");
        let deadline = Duration::from_secs(self.config.orchestrator.effective_shutdown_deadline_s());
        match self.supervisor.shutdown(deadline) {
            Ok(()) => {}
            Err(e @ SupervisionError::ShutdownDeadline { .. }) => {
                tracing::warn!(error = %e, "abandoning workers; their actions roll back on next start");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(outcome)
    }

    fn note_errors(&self, errors: &[GovernanceError], worker: &str) {
        for e in errors {
            tracing::warn!(worker, error = %e, "cycle error");
            if e.class() == ErrorClass::Fatal {
                tracing::error!(worker, error = %e, "fatal error inside a cycle");
            }
        }
        self.cycle_errors.fetch_add(errors.len() as u32, Ordering::Relaxed);
    }

    fn state(&self) -> std::sync::MutexGuard<'_, CorpusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_held(&self) -> Vec<ActionPlan> {
        if self.latch.is_set() {
            return Vec::new();
        }
        std::mem::take(&mut *self.held.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

fn results_root(config: &StewardConfig, base: &Path) -> PathBuf {
    let configured = PathBuf::from(config.orchestrator.effective_results_root());
    if configured.is_absolute() {
        configured
    } else {
        base.join(configured)
    }
}
