//! The executor: a bounded pool that runs plan actions through
//! lock -> snapshot -> Running -> transform -> validate -> commit or roll back.

use std::any::Any;
use std::collections::hash_map::Entry;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, RecvTimeoutError};
use rustc_hash::FxHashMap;
use steward_analysis::scanner::measure;
use steward_analysis::scanner::scanner::root_document_path;
use steward_core::config::{ExecutorConfig, ThresholdConfig};
use steward_core::errors::{GovernanceError, RemediationError, StewardErrorCode};
use steward_core::events::{
    ActionCompletedEvent, ActionFailedEvent, ActionStartedEvent, ErrorEvent, EventDispatcher,
    GovernanceEvent,
};
use steward_core::traits::{Cancellable, CancellationToken, Clock, RetryPolicy, SystemClock};
use steward_core::types::{Action, ActionKind, ActionPlan, ActionStatus, FileMetric, PlanStatus};
use steward_core::{AllowedRoots, StewardConfig};
use steward_storage::MetricStore;

use super::backup::{BackupStore, Snapshot};
use super::locks::SubjectLocks;
use super::types::{ActionOutcome, ActionReport, ExecutionReport};
use super::validate::Validator;
use crate::fsutil::read_text;
use crate::transforms::{self, EmergencyLatch, TransformContext, TransformOutput};

const WORKER: &str = "executor";

/// Where an action stands relative to its prerequisites.
enum Readiness {
    Ready,
    Waiting,
    Blocked(String),
}

pub struct Executor {
    pub(super) store: Arc<MetricStore>,
    pub(super) roots: AllowedRoots,
    config: ExecutorConfig,
    thresholds: ThresholdConfig,
    pub(super) retention_days: u32,
    root_document: String,
    pub(super) backups: BackupStore,
    locks: SubjectLocks,
    latch: EmergencyLatch,
    pub(super) events: EventDispatcher,
    pub(super) clock: Arc<dyn Clock>,
    inflight: Mutex<FxHashMap<String, CancellationToken>>,
}

impl Executor {
    /// `results_root` holds `backups/` and `locks/`.
    pub fn new(store: Arc<MetricStore>, roots: AllowedRoots, config: &StewardConfig, results_root: &Path) -> Self {
        let root_document = root_document_path(&roots, &config.scan.effective_root_document());
        Self {
            store,
            roots,
            config: config.executor.clone(),
            thresholds: config.thresholds.clone(),
            retention_days: config.backup.effective_retention_days(),
            root_document,
            backups: BackupStore::new(results_root),
            locks: SubjectLocks::new(results_root),
            latch: EmergencyLatch::new(),
            events: EventDispatcher::new(),
            clock: Arc::new(SystemClock),
            inflight: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn with_events(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share an existing latch, e.g. the orchestrator's.
    pub fn with_latch(mut self, latch: EmergencyLatch) -> Self {
        self.latch = latch;
        self
    }

    pub fn latch(&self) -> &EmergencyLatch {
        &self.latch
    }

    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    pub fn roots(&self) -> &AllowedRoots {
        &self.roots
    }

    pub fn root_document(&self) -> &str {
        &self.root_document
    }

    /// Number of actions currently inside their transform.
    pub fn running(&self) -> usize {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Ask every in-flight transform to stop. They roll back on their own.
    pub fn cancel_running(&self) -> usize {
        let inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        for token in inflight.values() {
            token.cancel();
        }
        inflight.len()
    }

    /// Run every action of a Ready plan and report per-action outcomes.
    ///
    /// Actions run on up to `executor.max_concurrent` workers. An action is
    /// only dispatched once all of its prerequisites have finished, and is
    /// skipped when any of them did not complete. Non-halt actions wait for
    /// every EmergencyHalt in the plan.
    pub fn execute_plan(&self, plan: &ActionPlan) -> Result<ExecutionReport, GovernanceError> {
        if !plan.is_dispatchable() {
            return Err(RemediationError::NotDispatchable {
                plan_id: plan.id.clone(),
                status: plan.status.name(),
            }
            .into());
        }
        self.store.update_plan_status(&plan.id, PlanStatus::Dispatched)?;

        let span = tracing::info_span!("execute_plan", plan_id = %plan.id, actions = plan.actions.len());
        let _guard = span.enter();

        let n = plan.actions.len();
        let index: FxHashMap<&str, usize> = plan
            .actions
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id.as_str(), i))
            .collect();
        let workers = self.config.effective_max_concurrent().min(n.max(1));
        let mut outcomes: Vec<Option<ActionOutcome>> = vec![None; n];
        let mut first_error: Option<GovernanceError> = None;

        thread::scope(|scope| {
            let (job_tx, job_rx) = bounded::<usize>(workers);
            let (result_tx, result_rx) = unbounded::<(usize, Result<ActionOutcome, GovernanceError>)>();
            let mut spawned = 0;
            for i in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let actions = &plan.actions;
                let worker = thread::Builder::new()
                    .name(format!("steward-exec-{i}"))
                    .spawn_scoped(scope, move || {
                        for idx in job_rx.iter() {
                            let outcome = self.run_action(&actions[idx]);
                            if result_tx.send((idx, outcome)).is_err() {
                                break;
                            }
                        }
                    });
                match worker {
                    Ok(_) => spawned += 1,
                    Err(e) => tracing::error!(error = %e, "failed to spawn executor worker"),
                }
            }
            drop(result_tx);
            if spawned == 0 {
                first_error = Some(
                    RemediationError::Transform {
                        kind: "executor",
                        message: "no executor worker could be started".to_string(),
                    }
                    .into(),
                );
                return;
            }

            let mut dispatched = vec![false; n];
            let mut in_flight = 0usize;
            loop {
                let mut progressed = true;
                while progressed {
                    progressed = false;
                    for idx in 0..n {
                        if dispatched[idx] || outcomes[idx].is_some() {
                            continue;
                        }
                        match readiness(&plan.actions, idx, &index, &outcomes) {
                            Readiness::Blocked(reason) => {
                                tracing::info!(action_id = %plan.actions[idx].id, %reason, "action skipped");
                                outcomes[idx] = Some(ActionOutcome::Skipped { reason });
                                progressed = true;
                            }
                            Readiness::Ready if in_flight < spawned => {
                                if job_tx.send(idx).is_err() {
                                    break;
                                }
                                dispatched[idx] = true;
                                in_flight += 1;
                            }
                            _ => {}
                        }
                    }
                }
                if in_flight == 0 {
                    break;
                }
                let Ok((idx, result)) = result_rx.recv() else {
                    break;
                };
                in_flight -= 1;
                match result {
                    Ok(outcome) => outcomes[idx] = Some(outcome),
                    Err(e) => {
                        tracing::error!(action_id = %plan.actions[idx].id, error = %e, "action aborted");
                        outcomes[idx] = Some(ActionOutcome::Failed {
                            error_code: e.error_code().to_string(),
                            reason: e.coded_string(),
                        });
                        first_error.get_or_insert(e);
                    }
                }
            }
            drop(job_tx);
        });

        if let Some(e) = first_error {
            return Err(e);
        }
        let actions = plan
            .actions
            .iter()
            .zip(outcomes)
            .map(|(action, outcome)| ActionReport {
                action_id: action.id.clone(),
                kind: action.kind,
                outcome: outcome.unwrap_or_else(|| ActionOutcome::Skipped {
                    reason: "prerequisites never became ready".to_string(),
                }),
            })
            .collect();
        let report = ExecutionReport {
            plan_id: plan.id.clone(),
            actions,
        };
        tracing::info!(
            completed = report.count("completed"),
            failed = report.count("failed"),
            deferred = report.count("deferred"),
            halted = report.count("halted"),
            "plan executed"
        );
        Ok(report)
    }

    /// Run one action to a terminal outcome. Only store failures are errors.
    pub fn run_action(&self, action: &Action) -> Result<ActionOutcome, GovernanceError> {
        let span = tracing::info_span!("action", action_id = %action.id, kind = %action.kind);
        let _guard = span.enter();

        if action.kind != ActionKind::EmergencyHalt && self.latch.is_set() {
            tracing::info!("emergency latch set, action held");
            return Ok(ActionOutcome::Halted);
        }

        let mut subjects: Vec<(String, PathBuf)> = Vec::with_capacity(action.subjects.len());
        for rel in &action.subjects {
            match self.roots.resolve(rel) {
                Ok(abs) => subjects.push((rel.clone(), abs)),
                Err(e) => return Ok(self.rejected(action, &e)),
            }
        }

        let attempts = self.config.effective_max_deferrals();
        let policy = RetryPolicy {
            max_retries: attempts,
            initial_backoff: Duration::from_millis(self.config.effective_defer_backoff_ms()),
            max_backoff: Duration::from_millis(self.config.effective_max_backoff_ms()),
        };
        match self
            .locks
            .with_locks(&action.subjects, &policy, attempts, || self.run_locked(action, &subjects))
        {
            Ok(result) => result,
            Err(RemediationError::LockBusy { path }) => {
                tracing::warn!(lock = %path.display(), attempts, "subjects busy, action deferred");
                Ok(ActionOutcome::Deferred { attempts })
            }
            Err(e) => Ok(self.rejected(action, &e)),
        }
    }

    fn run_locked(&self, action: &Action, subjects: &[(String, PathBuf)]) -> Result<ActionOutcome, GovernanceError> {
        let backup_dir = self.backups.dir(&action.id);
        let fresh = !backup_dir.exists();
        let snapshot = match self.backups.snapshot(&action.id, subjects, self.clock.now()) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                if fresh {
                    let _ = fs::remove_dir_all(&backup_dir);
                }
                return Ok(self.rejected(action, &e));
            }
        };
        if let Err(e) = self.store.put_backup(&snapshot.record()) {
            let _ = fs::remove_dir_all(&snapshot.dir);
            return Err(e.into());
        }

        let started_at = self.clock.now();
        self.store
            .update_action_status(&action.id, ActionStatus::Running, started_at, None, None)?;
        self.events.emit(&GovernanceEvent::ActionStarted(ActionStartedEvent {
            action_id: action.id.clone(),
            kind: action.kind,
            subjects: action.subjects.to_vec(),
            started_at,
        }));

        let token = CancellationToken::new();
        self.track(&action.id, Some(token.clone()));
        let result = self
            .transform(action, &snapshot, &token)
            .and_then(|output| self.validate(action, &snapshot, output));
        self.track(&action.id, None);

        match result {
            Ok(output) => self.commit(action, &snapshot, output, started_at),
            Err(e) => self.fail(action, &snapshot, &e),
        }
    }

    fn track(&self, action_id: &str, token: Option<CancellationToken>) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        match (inflight.entry(action_id.to_string()), token) {
            (Entry::Vacant(slot), Some(token)) => {
                slot.insert(token);
            }
            (Entry::Occupied(slot), None) => {
                slot.remove();
            }
            _ => {}
        }
    }

    /// Apply the transform on a scoped thread under the action's timeout.
    fn transform(
        &self,
        action: &Action,
        snapshot: &Snapshot,
        token: &CancellationToken,
    ) -> Result<TransformOutput, RemediationError> {
        let timeout_s = self.config.effective_timeout_s(action.estimated_duration_s);
        let timeout = Duration::try_from_secs_f64(timeout_s).unwrap_or(Duration::from_secs(60));
        let ctx = TransformContext {
            roots: &self.roots,
            thresholds: &self.thresholds,
            executor: &self.config,
            root_document: &self.root_document,
            latch: &self.latch,
            cancel: token,
            created: &snapshot.created,
        };

        thread::scope(|scope| {
            let (tx, rx) = bounded(1);
            let ctx = &ctx;
            let spawned = thread::Builder::new()
                .name(format!("steward-{}", action.kind))
                .spawn_scoped(scope, move || {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| transforms::apply(action, ctx)));
                    let _ = tx.send(result);
                });
            if let Err(e) = spawned {
                return Err(RemediationError::Transform {
                    kind: action.kind.name(),
                    message: format!("failed to spawn transform thread: {e}"),
                });
            }
            match rx.recv_timeout(timeout) {
                Ok(Ok(result)) => result,
                Ok(Err(payload)) => Err(RemediationError::Panicked {
                    action_id: action.id.clone(),
                    message: panic_message(payload.as_ref()),
                }),
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(timeout_s, "action timed out, cancelling transform");
                    token.cancel();
                    Err(RemediationError::Timeout {
                        action_id: action.id.clone(),
                        timeout_s,
                    })
                }
                Err(RecvTimeoutError::Disconnected) => Err(RemediationError::Panicked {
                    action_id: action.id.clone(),
                    message: "transform thread exited without a result".to_string(),
                }),
            }
        })
    }

    fn validate(
        &self,
        action: &Action,
        snapshot: &Snapshot,
        output: TransformOutput,
    ) -> Result<TransformOutput, RemediationError> {
        Validator {
            roots: &self.roots,
            snapshot,
            output: &output,
            latch: &self.latch,
        }
        .check_all(&action.success_criteria)?;
        Ok(output)
    }

    fn commit(
        &self,
        action: &Action,
        snapshot: &Snapshot,
        output: TransformOutput,
        started_at: i64,
    ) -> Result<ActionOutcome, GovernanceError> {
        let finished_at = self.clock.now();
        let post_metrics = self.post_metrics(&output, finished_at);
        if let Err(e) = self.store.update_action_status(
            &action.id,
            ActionStatus::Completed,
            finished_at,
            Some(&post_metrics),
            Some(&output.summary),
        ) {
            // Leave the corpus as the snapshot had it; startup recovery fixes the row.
            if let Err(restore) = self.backups.restore(snapshot, &self.roots) {
                tracing::error!(error = %restore, "rollback after failed commit also failed");
            }
            return Err(e.into());
        }
        self.events.emit(&GovernanceEvent::ActionCompleted(ActionCompletedEvent {
            action_id: action.id.clone(),
            kind: action.kind,
            finished_at,
            duration_s: (finished_at - started_at) as f64,
        }));
        tracing::info!(summary = %output.summary, files = post_metrics.len(), "action completed");
        Ok(ActionOutcome::Completed { post_metrics })
    }

    fn fail(
        &self,
        action: &Action,
        snapshot: &Snapshot,
        error: &RemediationError,
    ) -> Result<ActionOutcome, GovernanceError> {
        let error_code = error.error_code().to_string();
        let mut reason = error.coded_string();
        match self.backups.restore(snapshot, &self.roots) {
            Ok(report) => tracing::warn!(
                error = %error,
                restored = report.restored,
                removed = report.removed,
                "action failed, rolled back"
            ),
            Err(restore) => {
                tracing::error!(error = %error, rollback = %restore, "action failed and rollback failed");
                reason.push_str(&format!("; rollback failed: {}", restore.coded_string()));
            }
        }
        let finished_at = self.clock.now();
        self.store
            .update_action_status(&action.id, ActionStatus::Failed, finished_at, None, Some(&reason))?;
        self.events.emit(&GovernanceEvent::ActionFailed(ActionFailedEvent {
            action_id: action.id.clone(),
            kind: action.kind,
            finished_at,
            error_code: error_code.clone(),
            reason: reason.clone(),
        }));
        Ok(ActionOutcome::Failed { error_code, reason })
    }

    /// Refusal before any mutation. The action stays Pending.
    fn rejected(&self, action: &Action, error: &RemediationError) -> ActionOutcome {
        tracing::warn!(error = %error, "action rejected");
        self.events.emit(&GovernanceEvent::Error(ErrorEvent {
            worker: WORKER.to_string(),
            error_code: error.error_code().to_string(),
            message: format!("action {} rejected: {error}", action.id),
            fatal: false,
        }));
        ActionOutcome::Rejected {
            error_code: error.error_code().to_string(),
            reason: error.coded_string(),
        }
    }

    /// Re-measure every file the transform touched.
    fn post_metrics(&self, output: &TransformOutput, at: i64) -> Vec<FileMetric> {
        let mut metrics = Vec::new();
        for rel in output.touched() {
            let read = self.roots.resolve(rel).and_then(|abs| read_text(&abs));
            match read {
                Ok(raw) => metrics.push(measure(rel, &raw, at).0),
                Err(e) => tracing::warn!(path = %rel, error = %e, "post-metric unavailable"),
            }
        }
        metrics
    }
}

fn readiness(
    actions: &[Action],
    idx: usize,
    index: &FxHashMap<&str, usize>,
    outcomes: &[Option<ActionOutcome>],
) -> Readiness {
    let action = &actions[idx];
    if action.kind != ActionKind::EmergencyHalt {
        let halts_pending = actions
            .iter()
            .enumerate()
            .any(|(i, a)| a.kind == ActionKind::EmergencyHalt && outcomes[i].is_none());
        if halts_pending {
            return Readiness::Waiting;
        }
    }
    for prerequisite in &action.prerequisites {
        let Some(&i) = index.get(prerequisite.as_str()) else {
            return Readiness::Blocked(format!("unknown prerequisite {prerequisite}"));
        };
        match &outcomes[i] {
            None => return Readiness::Waiting,
            Some(outcome) if !outcome.is_completed() => {
                return Readiness::Blocked(format!("prerequisite {prerequisite} {}", outcome.name()));
            }
            Some(_) => {}
        }
    }
    Readiness::Ready
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
