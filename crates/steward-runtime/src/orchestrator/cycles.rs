//! The governance cycles. Each takes `now` explicitly and is callable both
//! from a supervised worker and from `run_once`.

use std::path::PathBuf;
use std::sync::PoisonError;

use rustc_hash::FxHashSet;
use steward_analysis::monitor::{monitor_snapshot, reconcile, Producer, Reconciliation};
use steward_analysis::DetectorInput;
use steward_core::errors::{GovernanceError, StorageError};
use steward_core::events::{GovernanceEvent, ScanCompletedEvent, ViolationClosedEvent, ViolationOpenedEvent};
use steward_core::traits::{with_backoff, RetryPolicy};
use steward_core::types::{ActionPlan, PlanStatus, SloSample, Violation};
use steward_remediation::{ExecutionReport, PlanContext};
use steward_storage::RollupPolicy;

use super::Orchestrator;
use crate::health::{overall_health, HealthScore};
use crate::reports::{Dashboard, GovernanceReport, ReportPeriod};

/// Violations a producer opened and closed in one cycle.
#[derive(Debug, Clone, Default)]
pub struct ViolationDelta {
    pub opened: Vec<Violation>,
    pub closed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScanCycleReport {
    pub file_count: usize,
    pub skipped: u32,
    pub opened: Vec<Violation>,
    pub closed: usize,
}

#[derive(Debug, Clone)]
pub struct SloCycleReport {
    pub samples: Vec<SloSample>,
    pub health: HealthScore,
    /// Emergency triggers that fired this cycle.
    pub triggers: Vec<String>,
}

/// What one `run_once` pass did.
#[derive(Debug, Default)]
pub struct CycleSummary {
    pub recovered: usize,
    pub files: usize,
    pub opened: usize,
    pub closed: usize,
    pub plans: usize,
    pub executed: Vec<ExecutionReport>,
    pub health: Option<HealthScore>,
    pub emergency: Option<String>,
    pub reports: Vec<PathBuf>,
}

impl Orchestrator {
    /// Scan the corpus, persist metrics, and reconcile reactive violations.
    pub fn scan_cycle(&self, now: i64) -> Result<ScanCycleReport, GovernanceError> {
        let snapshot = self
            .scanner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .scan_once(now)?;
        let metrics = snapshot.metrics();
        let retry = RetryPolicy::default();
        with_backoff(&retry, "put_file_metrics", || Ok(self.store.put_file_metrics(&metrics)?))?;

        let errors = self.cycle_errors.swap(0, std::sync::atomic::Ordering::Relaxed);
        let min_pair = self.detector.config().effective_cluster_edge_threshold();
        let report = monitor_snapshot(&self.monitor, &snapshot, min_pair, errors);
        with_backoff(&retry, "put_system_metric", || Ok(self.store.put_system_metric(&report.system)?))?;
        let mut violations = report.violations;
        violations.extend(self.quarantine_violations(&metrics));
        {
            let mut state = self.state();
            state.pairs = report.pairs;
            state.latest = metrics;
        }

        let open = self.store.open_violations()?;
        let delta = self.apply(&open, reconcile(Producer::Monitor, &open, violations), now)?;

        let file_count = snapshot.files.len();
        let skipped = snapshot.skipped_count();
        self.events.emit(&GovernanceEvent::ScanCompleted(ScanCompletedEvent {
            sampled_at: snapshot.sampled_at,
            file_count,
            skipped_files: skipped as usize,
            duration_ms: snapshot.duration_ms,
        }));
        tracing::info!(
            scan_file_count = file_count,
            scan_skipped = skipped,
            monitor_violations = delta.opened.len(),
            closed = delta.closed,
            "scan cycle complete"
        );
        Ok(ScanCycleReport {
            file_count,
            skipped,
            opened: delta.opened,
            closed: delta.closed,
        })
    }

    /// Run the pattern detectors over the stored history.
    pub fn detect_cycle(&self, now: i64) -> Result<ViolationDelta, GovernanceError> {
        let since = now - self.detector.config().effective_history_window_s() as i64;
        let input = DetectorInput {
            now,
            file_history: DetectorInput::group_history(self.store.all_file_history(since)?),
            system_history: self.store.system_history(since)?,
            pairs: self.state().pairs.clone(),
            violation_counts: self.store.violation_daily_counts(since)?,
        };
        let result = self.detector.detect(&input);
        self.note_errors(&result.errors, "detector");

        let open = self.store.open_violations()?;
        let delta = self.apply(&open, reconcile(Producer::Detector, &open, result.data.violations), now)?;
        tracing::info!(
            detector_violations = delta.opened.len(),
            closed = delta.closed,
            "detection cycle complete"
        );
        Ok(delta)
    }

    pub(super) fn apply(&self, open: &[Violation], rec: Reconciliation, now: i64) -> Result<ViolationDelta, StorageError> {
        let mut delta = ViolationDelta::default();
        for v in rec.opened {
            if self.store.put_violation(&v)? {
                tracing::info!(violation_id = %v.id, kind = %v.kind, severity = %v.severity, subject = %v.subject, "violation opened");
                self.events.emit(&GovernanceEvent::ViolationOpened(ViolationOpenedEvent {
                    violation: v.clone(),
                }));
                delta.opened.push(v);
            }
        }
        for id in rec.closed {
            self.store.update_violation_status(&id, now)?;
            delta.closed += 1;
            if let Some(v) = open.iter().find(|v| v.id == id) {
                tracing::info!(violation_id = %id, kind = %v.kind, "violation closed");
                self.events.emit(&GovernanceEvent::ViolationClosed(ViolationClosedEvent {
                    violation_id: id,
                    kind: v.kind,
                    subject: v.subject.clone(),
                    closed_at: now,
                }));
            }
        }
        Ok(delta)
    }

    /// Plan the still-open, not recently planned violations among `candidates`.
    ///
    /// A violation becomes eligible again `pattern_interval_s` after it was
    /// last planned, so failed or deferred remediation is retried. Returns
    /// `None` when nothing is eligible, before the first scan, or when the
    /// plan is empty.
    pub fn plan_cycle(&self, candidates: Vec<Violation>, now: i64) -> Result<Option<ActionPlan>, GovernanceError> {
        if candidates.is_empty() {
            return Ok(None);
        }
        let open: FxHashSet<String> = self.store.open_violations()?.into_iter().map(|v| v.id).collect();
        let replan_after = self.config.orchestrator.effective_pattern_interval_s() as i64;

        let state = self.state();
        if state.latest.is_empty() {
            return Ok(None);
        }
        let mut planned = self.planned.lock().unwrap_or_else(PoisonError::into_inner);
        let mut seen = FxHashSet::default();
        let eligible: Vec<Violation> = candidates
            .into_iter()
            .filter(|v| open.contains(&v.id) && seen.insert(v.id.clone()))
            .filter(|v| !self.is_quarantined(v))
            .filter(|v| planned.get(&v.id).map_or(true, |&at| now - at >= replan_after))
            .collect();
        if eligible.is_empty() {
            return Ok(None);
        }
        for v in &eligible {
            planned.insert(v.id.clone(), now);
        }
        drop(planned);

        let ctx = PlanContext {
            latest: &state.latest,
            pairs: &state.pairs,
            root_document: self.executor.root_document(),
        };
        let plan = self.planner.plan(&eligible, &ctx, now);
        drop(state);
        if plan.status == PlanStatus::Empty {
            tracing::debug!(violations = eligible.len(), "nothing actionable");
            return Ok(None);
        }
        self.store.put_plan(&plan)?;
        tracing::info!(
            plan_id = %plan.id,
            actions = plan.actions.len(),
            confidence = plan.overall_confidence,
            status = %plan.status.name(),
            "plan created"
        );
        Ok(Some(plan))
    }

    /// The plan, if it may be handed to the executor now. Plans below the
    /// confidence gate wait for approval; Ready plans are held during an
    /// emergency and released once it clears.
    pub fn dispatchable(&self, plan: ActionPlan) -> Option<ActionPlan> {
        if !plan.is_dispatchable() {
            tracing::info!(plan_id = %plan.id, status = plan.status.name(), "plan awaits approval");
            return None;
        }
        if self.latch.is_set() {
            tracing::warn!(plan_id = %plan.id, "emergency mode: plan held");
            self.held.lock().unwrap_or_else(PoisonError::into_inner).push(plan);
            return None;
        }
        Some(plan)
    }

    /// Run a plan. Subjects that failed on corrupt state are quarantined.
    pub fn execute(&self, plan: &ActionPlan) -> Result<ExecutionReport, GovernanceError> {
        let report = self.executor.execute_plan(plan)?;
        self.quarantine_corrupt(plan, &report, self.clock.now())?;
        self.announce();
        Ok(report)
    }

    /// Sample the KPIs, refresh the dashboard, and evaluate emergency triggers.
    pub fn slo_cycle(&self, now: i64) -> Result<SloCycleReport, GovernanceError> {
        let samples = match self.slo.sample(now) {
            Ok(samples) => samples,
            Err(StorageError::OutOfOrder { .. }) => {
                tracing::debug!(now, "KPIs already sampled at this time");
                self.slo.measure(now)?
            }
            Err(e) => return Err(e.into()),
        };
        let open = self.store.open_violations()?;
        let heartbeats = self.supervisor.heartbeats();
        let health = overall_health(&heartbeats, &samples, &open);
        tracing::info!(overall_health = health.overall, "health evaluated");

        let triggers = super::emergency_triggers(&self.config.emergency, &open, &samples, health.overall);
        if !triggers.is_empty() {
            self.enter_emergency(triggers.join("; "));
        }
        self.announce();

        let dashboard = Dashboard::new(now, health, self.latch.reason(), heartbeats, samples.clone(), &open);
        if let Err(e) = dashboard.write(&self.results_root) {
            tracing::warn!(error = %e, "dashboard not written");
        }
        Ok(SloCycleReport {
            samples,
            health,
            triggers,
        })
    }

    /// Daily and weekly reports, plus daily backup pruning and metric rollup.
    pub fn report_cycle(&self, now: i64) -> Result<Vec<PathBuf>, GovernanceError> {
        let (daily, weekly) = {
            let mut schedule = self.schedule.lock().unwrap_or_else(PoisonError::into_inner);
            (schedule.daily_due(now), schedule.weekly_due(now))
        };
        if daily.is_none() && weekly.is_none() {
            return Ok(Vec::new());
        }

        let health = overall_health(
            &self.supervisor.heartbeats(),
            &self.store.latest_slo_samples()?,
            &self.store.open_violations()?,
        );
        let mut periods = Vec::new();
        if daily.is_some() {
            periods.push(ReportPeriod::Daily);
        }
        if weekly.is_some() {
            periods.push(ReportPeriod::Weekly);
        }
        let mut written = Vec::new();
        for period in periods {
            let report = GovernanceReport::build(&self.store, period, now, health)?;
            match report.write(&self.results_root, now) {
                Ok(path) => {
                    tracing::info!(path = %path.display(), "report written");
                    written.push(path);
                }
                Err(e) => tracing::warn!(error = %e, "report not written"),
            }
        }

        if daily.is_some() {
            let pruned = self.executor.prune_backups()?;
            let policy = RollupPolicy {
                keep_per_path: self.config.storage.effective_keep_per_path(),
                rollup_after_days: self.config.storage.effective_rollup_after_days(),
            };
            let rollup = self.store.apply_rollup(&policy, now)?;
            tracing::info!(pruned, rolled_up = rollup.rolled_up, "daily maintenance complete");
        }
        Ok(written)
    }
}
