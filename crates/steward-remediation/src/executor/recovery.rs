//! Rollback, startup recovery, and backup retention.

use steward_core::errors::error_code::INTERRUPTED;
use steward_core::errors::{GovernanceError, StewardErrorCode, StorageError};
use steward_core::events::{ActionFailedEvent, ActionRolledBackEvent, GovernanceEvent};
use steward_core::types::{ActionPlan, ActionStatus};

use super::backup::RestoreReport;
use super::runner::Executor;

const INTERRUPTED_REASON: &str = "[INTERRUPTED] action was running when the process stopped; restored from backup";

impl Executor {
    /// Restore a Completed or Failed action's subjects and mark it RolledBack.
    pub fn rollback(&self, action_id: &str) -> Result<RestoreReport, GovernanceError> {
        let action = self.store.action(action_id)?.ok_or_else(|| StorageError::NotFound {
            entity: "action",
            id: action_id.to_string(),
        })?;
        if !action.status.can_transition_to(ActionStatus::RolledBack) {
            return Err(StorageError::InvalidTransition {
                id: action_id.to_string(),
                from: action.status.name().to_string(),
                to: ActionStatus::RolledBack.name().to_string(),
            }
            .into());
        }
        let snapshot = self.backups.load(action_id)?;
        let report = self.backups.restore(&snapshot, &self.roots)?;
        self.store
            .update_action_status(action_id, ActionStatus::RolledBack, self.clock.now(), None, None)?;
        self.events.emit(&GovernanceEvent::ActionRolledBack(ActionRolledBackEvent {
            action_id: action_id.to_string(),
            kind: action.kind,
            restored_files: report.restored,
            removed_files: report.removed,
        }));
        tracing::info!(action_id, restored = report.restored, removed = report.removed, "action rolled back");
        Ok(report)
    }

    /// Roll back every finished action of `plan` in its rollback order.
    /// Actions that never ran are passed over. Returns the ids rolled back.
    pub fn rollback_plan(&self, plan: &ActionPlan) -> Result<Vec<String>, GovernanceError> {
        let mut rolled_back = Vec::new();
        for action_id in &plan.rollback_sequence {
            let status = self.store.action(action_id)?.map(|a| a.status);
            if status.is_some_and(|s| s.can_transition_to(ActionStatus::RolledBack)) {
                self.rollback(action_id)?;
                rolled_back.push(action_id.clone());
            }
        }
        Ok(rolled_back)
    }

    /// Restore and fail every action a previous process left Running.
    pub fn recover_interrupted(&self) -> Result<Vec<String>, GovernanceError> {
        let mut recovered = Vec::new();
        for action in self.store.actions_with_status(ActionStatus::Running)? {
            let mut reason = INTERRUPTED_REASON.to_string();
            match self
                .backups
                .load(&action.id)
                .and_then(|snapshot| self.backups.restore(&snapshot, &self.roots))
            {
                Ok(report) => tracing::warn!(
                    action_id = %action.id,
                    restored = report.restored,
                    removed = report.removed,
                    "interrupted action restored"
                ),
                Err(e) => {
                    tracing::error!(action_id = %action.id, error = %e, "interrupted action could not be restored");
                    reason.push_str(&format!("; restore failed: {}", e.coded_string()));
                }
            }
            let at = self.clock.now();
            self.store
                .update_action_status(&action.id, ActionStatus::Failed, at, None, Some(&reason))?;
            self.events.emit(&GovernanceEvent::ActionFailed(ActionFailedEvent {
                action_id: action.id.clone(),
                kind: action.kind,
                finished_at: at,
                error_code: INTERRUPTED.to_string(),
                reason,
            }));
            recovered.push(action.id);
        }
        Ok(recovered)
    }

    /// Scheduled retention job.
    pub fn prune_backups(&self) -> Result<usize, GovernanceError> {
        self.backups.prune(&self.store, self.retention_days, self.clock.now())
    }
}
