//! Violations in, one ordered plan out. No I/O.

use rustc_hash::FxHashMap;
use smallvec::{smallvec, SmallVec};
use steward_analysis::SimilarityPair;
use steward_core::config::ThresholdConfig;
use steward_core::types::{
    Action, ActionKind, ActionPlan, ActionStatus, FileMetric, PlanStatus, Severity,
    SuccessCriterion, Subject, Violation, ViolationKind,
};
use steward_core::StewardConfig;
use uuid::Uuid;

use super::confidence::{confidence, estimated_duration_s, MAX_CONFIDENCE};

/// GrowthTrend only earns a Modularize once the file is this close to the limit.
pub const GROWTH_ACTION_FRACTION: f64 = 0.9;
/// Most files bundled into one system-wide ResolveDebt action.
pub const MAX_DEBT_SUBJECTS: usize = 16;

/// Corpus state the planner needs besides the violations.
#[derive(Debug, Clone, Copy)]
pub struct PlanContext<'a> {
    /// Latest metric per file.
    pub latest: &'a [FileMetric],
    pub pairs: &'a [SimilarityPair],
    /// Corpus path of the root navigation document.
    pub root_document: &'a str,
}

impl PlanContext<'_> {
    fn metric(&self, path: &str) -> Option<&FileMetric> {
        self.latest.iter().find(|m| m.path == path)
    }

    fn lines(&self, path: &str) -> u64 {
        self.metric(path).map_or(0, |m| u64::from(m.line_count))
    }
}

/// An action before ids and ordering are fixed.
#[derive(Debug, Clone)]
struct Draft {
    violation_id: String,
    kind: ActionKind,
    subjects: SmallVec<[String; 2]>,
    confidence: f64,
    duration_s: f64,
}

impl Draft {
    fn key(&self) -> (ActionKind, Vec<String>) {
        let mut subjects = self.subjects.to_vec();
        subjects.sort();
        (self.kind, subjects)
    }
}

#[derive(Debug, Clone)]
pub struct RemediationPlanner {
    thresholds: ThresholdConfig,
    confidence_gate: f64,
    auto_execute: bool,
    modularize_output_factor: f64,
    external_converter: bool,
}

impl RemediationPlanner {
    pub fn new(config: &StewardConfig) -> Self {
        Self {
            thresholds: config.thresholds.clone(),
            confidence_gate: config.executor.effective_confidence_gate(),
            auto_execute: config.planner.effective_auto_execute(),
            modularize_output_factor: config.executor.effective_modularize_output_factor(),
            external_converter: !config.executor.converter_command.is_empty(),
        }
    }

    /// Build the plan for `violations`.
    pub fn plan(&self, violations: &[Violation], ctx: &PlanContext<'_>, now: i64) -> ActionPlan {
        let plan_id = format!("plan-{}", Uuid::new_v4());

        let mut drafts: Vec<Draft> = Vec::new();
        let mut by_key: FxHashMap<(ActionKind, Vec<String>), usize> = FxHashMap::default();
        let mut merge = |draft: Draft, drafts: &mut Vec<Draft>| match by_key.get(&draft.key()) {
            Some(&i) => {
                if draft.confidence > drafts[i].confidence {
                    drafts[i] = draft;
                }
            }
            None => {
                by_key.insert(draft.key(), drafts.len());
                drafts.push(draft);
            }
        };

        for violation in violations.iter().filter(|v| v.is_open()) {
            if let Some(draft) = self.draft(violation, ctx) {
                merge(draft, &mut drafts);
            }
        }
        if let Some(critical) = violations
            .iter()
            .find(|v| v.is_open() && v.severity == Severity::Critical)
        {
            merge(
                Draft {
                    violation_id: critical.id.clone(),
                    kind: ActionKind::EmergencyHalt,
                    subjects: SmallVec::new(),
                    confidence: MAX_CONFIDENCE,
                    duration_s: estimated_duration_s(ActionKind::EmergencyHalt, 0),
                },
                &mut drafts,
            );
        }

        drafts.sort_by(|a, b| {
            a.kind
                .execution_rank()
                .cmp(&b.kind.execution_rank())
                .then(b.confidence.total_cmp(&a.confidence))
                .then(a.duration_s.total_cmp(&b.duration_s))
        });

        let mut actions: Vec<Action> = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let prerequisites = actions
                .iter()
                .filter(|earlier| earlier.subjects.iter().any(|s| draft.subjects.contains(s)))
                .map(|earlier| earlier.id.clone())
                .collect();
            let success_criteria = self.criteria(draft.kind, &draft.subjects, ctx);
            actions.push(Action {
                id: format!("act-{}", Uuid::new_v4()),
                plan_id: plan_id.clone(),
                violation_id: draft.violation_id,
                kind: draft.kind,
                subjects: draft.subjects,
                confidence: draft.confidence,
                estimated_duration_s: draft.duration_s,
                prerequisites,
                success_criteria,
                status: ActionStatus::Pending,
                created_at: now,
                started_at: None,
                finished_at: None,
                diagnostics: None,
            });
        }

        let overall_confidence = if actions.is_empty() {
            0.0
        } else {
            actions.iter().map(|a| a.confidence).sum::<f64>() / actions.len() as f64
        };
        let status = if actions.is_empty() {
            PlanStatus::Empty
        } else if overall_confidence >= self.confidence_gate || self.auto_execute {
            PlanStatus::Ready
        } else {
            PlanStatus::NeedsApproval
        };
        let rollback_sequence = actions.iter().rev().map(|a| a.id.clone()).collect();

        tracing::info!(
            plan_id = %plan_id,
            violations = violations.len(),
            actions = actions.len(),
            overall_confidence,
            status = status.name(),
            "plan built"
        );
        ActionPlan {
            id: plan_id,
            created_at: now,
            actions,
            overall_confidence,
            rollback_sequence,
            status,
        }
    }

    /// The action a violation maps to, if any.
    fn draft(&self, violation: &Violation, ctx: &PlanContext<'_>) -> Option<Draft> {
        let (kind, subjects): (ActionKind, SmallVec<[String; 2]>) = match (&violation.kind, &violation.subject) {
            (ViolationKind::FileSize, Subject::File(path)) => (ActionKind::Modularize, smallvec![path.clone()]),
            (ViolationKind::GrowthTrend, Subject::File(path)) => {
                let limit = f64::from(self.thresholds.effective_max_file_lines()) * GROWTH_ACTION_FRACTION;
                if (ctx.lines(path) as f64) < limit {
                    return None;
                }
                (ActionKind::Modularize, smallvec![path.clone()])
            }
            (ViolationKind::Duplication, Subject::Pair(a, b)) => {
                (ActionKind::Consolidate, smallvec![a.clone(), b.clone()])
            }
            (ViolationKind::DuplicationCluster, Subject::Group(members)) => {
                let (a, b) = best_pair(members, ctx.pairs)?;
                let mut subjects: SmallVec<[String; 2]> = smallvec![a, b];
                let rest: Vec<String> = members.iter().filter(|m| !subjects.contains(m)).cloned().collect();
                subjects.extend(rest);
                (ActionKind::Consolidate, subjects)
            }
            (ViolationKind::TechnicalDebt, Subject::File(path)) => {
                (ActionKind::ResolveDebt, smallvec![path.clone()])
            }
            (ViolationKind::TechnicalDebt, Subject::System) => {
                let mut indebted: Vec<&FileMetric> =
                    ctx.latest.iter().filter(|m| m.debt_marker_count > 0).collect();
                if indebted.is_empty() {
                    return None;
                }
                indebted.sort_by(|a, b| b.debt_marker_count.cmp(&a.debt_marker_count).then(a.path.cmp(&b.path)));
                let subjects = indebted
                    .into_iter()
                    .take(MAX_DEBT_SUBJECTS)
                    .map(|m| m.path.clone())
                    .collect();
                (ActionKind::ResolveDebt, subjects)
            }
            (ViolationKind::NavigationPerformance, _) => {
                (ActionKind::OptimizeStructure, smallvec![ctx.root_document.to_string()])
            }
            (ViolationKind::FormatCompliance, subject) => {
                let subjects: SmallVec<[String; 2]> = match subject {
                    Subject::File(path) => smallvec![path.clone()],
                    _ => ctx
                        .latest
                        .iter()
                        .filter(|m| !m.has_title || m.format_issue_count > 0)
                        .map(|m| m.path.clone())
                        .collect(),
                };
                if subjects.is_empty() {
                    return None;
                }
                (ActionKind::ConvertFormat, subjects)
            }
            _ => return None,
        };
        let subject_lines = subjects.iter().map(|p| ctx.lines(p)).sum();
        Some(Draft {
            violation_id: violation.id.clone(),
            kind,
            confidence: confidence(kind, violation),
            duration_s: estimated_duration_s(kind, subject_lines),
            subjects,
        })
    }

    fn criteria(&self, kind: ActionKind, subjects: &[String], ctx: &PlanContext<'_>) -> Vec<SuccessCriterion> {
        let t = &self.thresholds;
        match kind {
            ActionKind::Modularize => subjects
                .iter()
                .flat_map(|path| {
                    [
                        SuccessCriterion::LineCountAtMost {
                            path: path.clone(),
                            max: t.effective_max_file_lines(),
                        },
                        SuccessCriterion::SectionsLinkedExactlyOnce { path: path.clone() },
                        SuccessCriterion::NoDanglingLinks { path: path.clone() },
                        SuccessCriterion::TotalOutputLinesAtMost {
                            path: path.clone(),
                            factor: self.modularize_output_factor,
                        },
                    ]
                })
                .collect(),
            ActionKind::Consolidate => match subjects {
                [a, b, ..] => {
                    let mut criteria = vec![SuccessCriterion::ConsolidatedFileReferenced {
                        a: a.clone(),
                        b: b.clone(),
                    }];
                    // A cluster is resolved only once no two members are duplicates.
                    for (i, x) in subjects.iter().enumerate() {
                        for y in &subjects[i + 1..] {
                            criteria.push(SuccessCriterion::SimilarityBelow {
                                a: x.clone(),
                                b: y.clone(),
                                threshold: t.effective_duplication(),
                            });
                        }
                    }
                    criteria
                }
                _ => Vec::new(),
            },
            ActionKind::ResolveDebt => subjects
                .iter()
                .map(|path| SuccessCriterion::DebtStrictlyDecreases { path: path.clone() })
                .collect(),
            ActionKind::OptimizeStructure => vec![SuccessCriterion::CognitiveStepsAtMost {
                path: ctx.root_document.to_string(),
                max: t.effective_max_cognitive_steps(),
            }],
            ActionKind::ConvertFormat if !self.external_converter => subjects
                .iter()
                .map(|path| SuccessCriterion::Idempotent { path: path.clone() })
                .collect(),
            ActionKind::ConvertFormat => Vec::new(),
            ActionKind::EmergencyHalt => vec![SuccessCriterion::EmergencyLatched],
        }
    }
}

/// Most similar known pair inside a cluster, else its first two members.
/// The rest of the cluster follows the pair in the action's subjects.
fn best_pair(members: &[String], pairs: &[SimilarityPair]) -> Option<(String, String)> {
    let best = pairs
        .iter()
        .filter(|p| members.contains(&p.a) && members.contains(&p.b))
        .max_by(|x, y| x.score.total_cmp(&y.score));
    match (best, members) {
        (Some(p), _) => Some((p.a.clone(), p.b.clone())),
        (None, [a, b, ..]) => Some((a.clone(), b.clone())),
        _ => None,
    }
}
