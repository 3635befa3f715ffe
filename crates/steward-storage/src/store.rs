//! MetricStore: the typed operations every other component uses.

use std::path::Path;

use steward_core::config::StorageConfig;
use steward_core::errors::StorageError;
use steward_core::types::{
    Action, ActionPlan, ActionStatus, BackupRecord, FileMetric, PlanStatus, SloMetric, SloSample,
    SubsystemHeartbeat, SystemMetric, Violation, ViolationKind,
};

use crate::connection::writer::with_immediate_transaction;
use crate::connection::DatabaseManager;
use crate::queries::{self, events::EventRow};
use crate::retention::{self, DailyRollup, RollupPolicy, RollupReport};

/// Single owner of durable governance state.
pub struct MetricStore {
    db: DatabaseManager,
}

impl MetricStore {
    pub fn open(path: &Path, config: &StorageConfig) -> Result<Self, StorageError> {
        Ok(Self {
            db: DatabaseManager::open(path, config.effective_read_pool_size())?,
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self {
            db: DatabaseManager::open_in_memory()?,
        })
    }

    pub fn database(&self) -> &DatabaseManager {
        &self.db
    }

    // ---- Writers ----

    pub fn put_file_metrics(&self, batch: &[FileMetric]) -> Result<usize, StorageError> {
        let start = std::time::Instant::now();
        let n = self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| queries::file_metrics::insert_batch(tx, batch))
        })?;
        tracing::debug!(
            rows = n,
            batch_write_time = start.elapsed().as_millis() as u64,
            "file metrics written"
        );
        Ok(n)
    }

    pub fn put_system_metric(&self, metric: &SystemMetric) -> Result<(), StorageError> {
        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| queries::system_metrics::insert(tx, metric))
        })
    }

    /// Returns false when the violation was already recorded.
    pub fn put_violation(&self, violation: &Violation) -> Result<bool, StorageError> {
        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| queries::violations::insert(tx, violation))
        })
    }

    pub fn update_violation_status(&self, id: &str, closed_at: i64) -> Result<(), StorageError> {
        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| queries::violations::close(tx, id, closed_at))
        })
    }

    pub fn put_plan(&self, plan: &ActionPlan) -> Result<(), StorageError> {
        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| queries::actions::insert_plan(tx, plan))
        })
    }

    pub fn update_plan_status(&self, id: &str, status: PlanStatus) -> Result<(), StorageError> {
        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| {
                queries::actions::update_plan_status(tx, id, status)
            })
        })
    }

    /// Append a standalone action at the end of its plan.
    pub fn put_action(&self, action: &Action) -> Result<(), StorageError> {
        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| queries::actions::append(tx, action))
        })
    }

    pub fn update_action_status(
        &self,
        id: &str,
        status: ActionStatus,
        at: i64,
        post_metrics: Option<&[FileMetric]>,
        diagnostics: Option<&str>,
    ) -> Result<(), StorageError> {
        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| {
                queries::actions::update_status(tx, id, status, at, post_metrics, diagnostics)
            })
        })
    }

    pub fn put_backup(&self, backup: &BackupRecord) -> Result<(), StorageError> {
        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| queries::backups::insert(tx, backup))
        })
    }

    pub fn mark_backup_pruned(&self, action_id: &str, at: i64) -> Result<(), StorageError> {
        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| queries::backups::mark_pruned(tx, action_id, at))
        })
    }

    pub fn put_slo_sample(&self, sample: &SloSample) -> Result<(), StorageError> {
        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| queries::slo::insert(tx, sample))
        })
    }

    pub fn put_heartbeat(&self, heartbeat: &SubsystemHeartbeat) -> Result<(), StorageError> {
        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| queries::heartbeats::upsert(tx, heartbeat))
        })
    }

    pub fn put_event(&self, at: i64, name: &str, payload: &str) -> Result<i64, StorageError> {
        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| queries::events::insert(tx, at, name, payload))
        })
    }

    /// Fold old raw file metrics into daily rows.
    pub fn apply_rollup(&self, policy: &RollupPolicy, now: i64) -> Result<RollupReport, StorageError> {
        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| retention::apply_rollup(tx, policy, now))
        })
    }

    // ---- Readers ----

    pub fn file_history(&self, path: &str, since: i64) -> Result<Vec<FileMetric>, StorageError> {
        self.db
            .with_reader(|conn| queries::file_metrics::history(conn, path, since))
    }

    /// Every file sample since `since`, ordered by path then time.
    pub fn all_file_history(&self, since: i64) -> Result<Vec<FileMetric>, StorageError> {
        self.db
            .with_reader(|conn| queries::file_metrics::all_history(conn, since))
    }

    pub fn file_metrics_at(&self, sampled_at: i64) -> Result<Vec<FileMetric>, StorageError> {
        self.db
            .with_reader(|conn| queries::file_metrics::at(conn, sampled_at))
    }

    pub fn latest_file_metric(&self, path: &str) -> Result<Option<FileMetric>, StorageError> {
        self.db
            .with_reader(|conn| queries::file_metrics::latest(conn, path))
    }

    /// Latest sample of every path ever scanned, including since-deleted files.
    pub fn latest_file_metrics(&self) -> Result<Vec<FileMetric>, StorageError> {
        self.db.with_reader(queries::file_metrics::latest_all)
    }

    pub fn daily_rollups(&self, path: &str) -> Result<Vec<DailyRollup>, StorageError> {
        self.db
            .with_reader(|conn| retention::daily_rollups(conn, path))
    }

    pub fn latest_system_metric(&self) -> Result<Option<SystemMetric>, StorageError> {
        self.db.with_reader(queries::system_metrics::latest)
    }

    pub fn system_history(&self, since: i64) -> Result<Vec<SystemMetric>, StorageError> {
        self.db
            .with_reader(|conn| queries::system_metrics::history(conn, since))
    }

    pub fn open_violations(&self) -> Result<Vec<Violation>, StorageError> {
        self.db.with_reader(queries::violations::open)
    }

    pub fn violation(&self, id: &str) -> Result<Option<Violation>, StorageError> {
        self.db.with_reader(|conn| queries::violations::get(conn, id))
    }

    pub fn violations_opened_since(&self, since: i64) -> Result<Vec<Violation>, StorageError> {
        self.db
            .with_reader(|conn| queries::violations::opened_since(conn, since))
    }

    pub fn violation_daily_counts(
        &self,
        since: i64,
    ) -> Result<Vec<(ViolationKind, i64, u32)>, StorageError> {
        self.db
            .with_reader(|conn| queries::violations::daily_counts(conn, since))
    }

    pub fn plan(&self, id: &str) -> Result<Option<ActionPlan>, StorageError> {
        self.db.with_reader(|conn| queries::actions::get_plan(conn, id))
    }

    pub fn action(&self, id: &str) -> Result<Option<Action>, StorageError> {
        self.db.with_reader(|conn| queries::actions::get(conn, id))
    }

    pub fn actions_with_status(&self, status: ActionStatus) -> Result<Vec<Action>, StorageError> {
        self.db
            .with_reader(|conn| queries::actions::with_status(conn, status))
    }

    pub fn actions_finished_since(&self, since: i64) -> Result<Vec<Action>, StorageError> {
        self.db
            .with_reader(|conn| queries::actions::finished_since(conn, since))
    }

    pub fn action_post_metrics(&self, id: &str) -> Result<Option<Vec<FileMetric>>, StorageError> {
        self.db
            .with_reader(|conn| queries::actions::post_metrics(conn, id))
    }

    pub fn backup(&self, action_id: &str) -> Result<Option<BackupRecord>, StorageError> {
        self.db
            .with_reader(|conn| queries::backups::get(conn, action_id))
    }

    pub fn backups_created_before(&self, before: i64) -> Result<Vec<BackupRecord>, StorageError> {
        self.db
            .with_reader(|conn| queries::backups::created_before(conn, before))
    }

    /// Samples of `metric` taken at or after `since`, in persistence order.
    pub fn recent_samples(&self, metric: SloMetric, since: i64) -> Result<Vec<SloSample>, StorageError> {
        self.db
            .with_reader(|conn| queries::slo::recent(conn, metric, since))
    }

    pub fn latest_slo_samples(&self) -> Result<Vec<SloSample>, StorageError> {
        self.db.with_reader(queries::slo::latest_per_metric)
    }

    pub fn heartbeats(&self) -> Result<Vec<SubsystemHeartbeat>, StorageError> {
        self.db.with_reader(queries::heartbeats::all)
    }

    pub fn events_since(&self, since: i64) -> Result<Vec<EventRow>, StorageError> {
        self.db.with_reader(|conn| queries::events::since(conn, since))
    }

    pub fn probe(&self) -> Result<(), StorageError> {
        self.db.probe()
    }
}
