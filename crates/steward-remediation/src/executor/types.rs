//! Executor results.

use serde::Serialize;
use steward_core::types::{ActionKind, FileMetric};

/// How one action ended for this dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Validated and committed.
    Completed { post_metrics: Vec<FileMetric> },
    /// Rolled back after a transform, validation, or timeout failure.
    Failed { error_code: String, reason: String },
    /// Subject locks stayed busy; the action is still Pending.
    Deferred { attempts: u32 },
    /// The emergency latch is set; the action is still Pending.
    Halted,
    /// A prerequisite did not complete.
    Skipped { reason: String },
    /// Refused before any mutation (paths outside roots, backup failure).
    Rejected { error_code: String, reason: String },
}

impl ActionOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
            Self::Deferred { .. } => "deferred",
            Self::Halted => "halted",
            Self::Skipped { .. } => "skipped",
            Self::Rejected { .. } => "rejected",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionReport {
    pub action_id: String,
    pub kind: ActionKind,
    pub outcome: ActionOutcome,
}

/// Per-action outcomes of one plan, in plan order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionReport {
    pub plan_id: String,
    pub actions: Vec<ActionReport>,
}

impl ExecutionReport {
    pub fn outcome(&self, action_id: &str) -> Option<&ActionOutcome> {
        self.actions
            .iter()
            .find(|r| r.action_id == action_id)
            .map(|r| &r.outcome)
    }

    pub fn count(&self, name: &str) -> usize {
        self.actions.iter().filter(|r| r.outcome.name() == name).count()
    }
}
