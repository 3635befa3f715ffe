//! Remediation plans and actions.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Closed set of remediation transformations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Modularize,
    Consolidate,
    ResolveDebt,
    OptimizeStructure,
    ConvertFormat,
    EmergencyHalt,
}

impl ActionKind {
    pub const ALL: [ActionKind; 6] = [
        Self::Modularize,
        Self::Consolidate,
        Self::ResolveDebt,
        Self::OptimizeStructure,
        Self::ConvertFormat,
        Self::EmergencyHalt,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Modularize => "modularize",
            Self::Consolidate => "consolidate",
            Self::ResolveDebt => "resolve_debt",
            Self::OptimizeStructure => "optimize_structure",
            Self::ConvertFormat => "convert_format",
            Self::EmergencyHalt => "emergency_halt",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == s)
    }

    /// Position in plan execution order. EmergencyHalt always runs first.
    pub fn execution_rank(&self) -> u8 {
        match self {
            Self::EmergencyHalt => 0,
            Self::ConvertFormat => 1,
            Self::ResolveDebt => 2,
            Self::Consolidate => 3,
            Self::Modularize => 4,
            Self::OptimizeStructure => 5,
        }
    }

    /// Base duration estimate in seconds, before scaling by subject size.
    pub fn base_duration_s(&self) -> f64 {
        match self {
            Self::Modularize => 30.0,
            Self::Consolidate => 20.0,
            Self::ResolveDebt => 10.0,
            Self::OptimizeStructure => 15.0,
            Self::ConvertFormat => 45.0,
            Self::EmergencyHalt => 1.0,
        }
    }

    /// True when the transformation writes to corpus files.
    pub fn mutates_corpus(&self) -> bool {
        !matches!(self, Self::EmergencyHalt)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Action lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    RolledBack,
}

impl ActionStatus {
    pub const ALL: [ActionStatus; 5] = [
        Self::Pending,
        Self::Running,
        Self::Completed,
        Self::Failed,
        Self::RolledBack,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::RolledBack => "rolled_back",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == s)
    }

    /// Pending -> Running -> {Completed | Failed} -> RolledBack.
    pub fn can_transition_to(&self, next: ActionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
                | (Self::Completed, Self::RolledBack)
                | (Self::Failed, Self::RolledBack)
        )
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::RolledBack)
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Post-condition predicates evaluated by the executor after a transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "criterion", rename_all = "snake_case")]
pub enum SuccessCriterion {
    /// The file has at most `max` lines.
    LineCountAtMost { path: String, max: u32 },
    /// The file plus every file the transform created hold at most
    /// `factor` times the file's original line count.
    TotalOutputLinesAtMost { path: String, factor: f64 },
    /// Every file created by the transform is linked exactly once from `path`.
    SectionsLinkedExactlyOnce { path: String },
    /// Every relative link in `path` and in created files resolves.
    NoDanglingLinks { path: String },
    /// Debt marker count is strictly lower than before the transform.
    DebtStrictlyDecreases { path: String },
    /// Similarity between the two files is below `threshold`.
    SimilarityBelow { a: String, b: String, threshold: f64 },
    /// A consolidated file was created and both originals link it.
    ConsolidatedFileReferenced { a: String, b: String },
    /// Cognitive steps of the navigation document are at most `max`.
    CognitiveStepsAtMost { path: String, max: f64 },
    /// Running the normalizer again changes nothing.
    Idempotent { path: String },
    /// The emergency latch is set.
    EmergencyLatched,
}

impl SuccessCriterion {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LineCountAtMost { .. } => "line_count_at_most",
            Self::TotalOutputLinesAtMost { .. } => "total_output_lines_at_most",
            Self::SectionsLinkedExactlyOnce { .. } => "sections_linked_exactly_once",
            Self::NoDanglingLinks { .. } => "no_dangling_links",
            Self::DebtStrictlyDecreases { .. } => "debt_strictly_decreases",
            Self::SimilarityBelow { .. } => "similarity_below",
            Self::ConsolidatedFileReferenced { .. } => "consolidated_file_referenced",
            Self::CognitiveStepsAtMost { .. } => "cognitive_steps_at_most",
            Self::Idempotent { .. } => "idempotent",
            Self::EmergencyLatched => "emergency_latched",
        }
    }
}

/// A single bounded, reversible transformation of one or more subjects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub plan_id: String,
    pub violation_id: String,
    pub kind: ActionKind,
    pub subjects: SmallVec<[String; 2]>,
    pub confidence: f64,
    pub estimated_duration_s: f64,
    /// Ids of actions that must complete first.
    pub prerequisites: Vec<String>,
    pub success_criteria: Vec<SuccessCriterion>,
    pub status: ActionStatus,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub diagnostics: Option<String>,
}

/// Plan dispatch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// No actionable violations.
    Empty,
    /// Passed the confidence gate, awaiting dispatch.
    Ready,
    /// Held back by the confidence gate.
    NeedsApproval,
    /// Handed to the executor.
    Dispatched,
}

impl PlanStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Ready => "ready",
            Self::NeedsApproval => "needs_approval",
            Self::Dispatched => "dispatched",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [Self::Empty, Self::Ready, Self::NeedsApproval, Self::Dispatched]
            .into_iter()
            .find(|k| k.name() == s)
    }
}

/// Ordered batch of actions with its rollback sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub id: String,
    pub created_at: i64,
    pub actions: Vec<Action>,
    pub overall_confidence: f64,
    /// Action ids in reverse execution order.
    pub rollback_sequence: Vec<String>,
    pub status: PlanStatus,
}

impl ActionPlan {
    pub fn is_dispatchable(&self) -> bool {
        self.status == PlanStatus::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_transitions() {
        use ActionStatus::*;
        assert!(Pending.can_transition_to(Running));
        assert!(Running.can_transition_to(Completed));
        assert!(Running.can_transition_to(Failed));
        assert!(Completed.can_transition_to(RolledBack));
        assert!(Failed.can_transition_to(RolledBack));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Running));
        assert!(!RolledBack.can_transition_to(Pending));
        assert!(!Failed.can_transition_to(Completed));
    }

    #[test]
    fn execution_rank_order() {
        let mut kinds = ActionKind::ALL.to_vec();
        kinds.sort_by_key(|k| k.execution_rank());
        assert_eq!(
            kinds,
            vec![
                ActionKind::EmergencyHalt,
                ActionKind::ConvertFormat,
                ActionKind::ResolveDebt,
                ActionKind::Consolidate,
                ActionKind::Modularize,
                ActionKind::OptimizeStructure,
            ]
        );
    }

    #[test]
    fn criteria_serialize_with_tag() {
        let c = SuccessCriterion::LineCountAtMost {
            path: "docs/a.md".into(),
            max: 1500,
        };
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"criterion\":\"line_count_at_most\""));
        let back: SuccessCriterion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
