//! Corrupt-state handling. A subject whose remediation failed on corrupt
//! state is quarantined: nothing more is planned for it and an Anomaly
//! violation stays open until its content changes or it leaves the corpus.
//! Corrupt state is never retried.

use std::sync::PoisonError;

use steward_analysis::monitor::Reconciliation;
use steward_core::errors::{error_code, StorageError};
use steward_core::types::{ActionPlan, FileMetric, Severity, Subject, Violation, ViolationKind};
use steward_remediation::{ActionOutcome, ExecutionReport};

use super::{Orchestrator, ViolationDelta};

#[derive(Debug, Clone)]
pub(super) struct Quarantined {
    /// Content hash when quarantined; `None` if the scanner could not read it.
    hash: Option<u64>,
    violation: Violation,
}

impl Orchestrator {
    /// Quarantine every subject of an action that failed on corrupt state.
    pub(super) fn quarantine_corrupt(
        &self,
        plan: &ActionPlan,
        report: &ExecutionReport,
        now: i64,
    ) -> Result<ViolationDelta, StorageError> {
        let mut fresh = Vec::new();
        {
            let state = self.state();
            let mut quarantine = self.quarantine.lock().unwrap_or_else(PoisonError::into_inner);
            for r in &report.actions {
                let reason = match &r.outcome {
                    ActionOutcome::Failed { error_code: code, reason }
                    | ActionOutcome::Rejected { error_code: code, reason }
                        if code.as_str() == error_code::CORRUPT_STATE =>
                    {
                        reason
                    }
                    _ => continue,
                };
                let Some(action) = plan.actions.iter().find(|a| a.id == r.action_id) else {
                    continue;
                };
                for path in &action.subjects {
                    if quarantine.contains_key(path) {
                        continue;
                    }
                    let hash = state.latest.iter().find(|m| &m.path == path).map(|m| m.content_hash);
                    let violation = quarantine_violation(path, reason, now);
                    tracing::warn!(path = %path, action_id = %action.id, %reason, "subject quarantined");
                    quarantine.insert(
                        path.clone(),
                        Quarantined {
                            hash,
                            violation: violation.clone(),
                        },
                    );
                    fresh.push(violation);
                }
            }
        }
        if fresh.is_empty() {
            return Ok(ViolationDelta::default());
        }
        let open = self.store.open_violations()?;
        self.apply(
            &open,
            Reconciliation {
                opened: fresh,
                ..Reconciliation::default()
            },
            now,
        )
    }

    /// Release subjects whose content changed or that no longer exist, and
    /// return the Anomaly violations of those still held.
    pub(super) fn quarantine_violations(&self, latest: &[FileMetric]) -> Vec<Violation> {
        let mut quarantine = self.quarantine.lock().unwrap_or_else(PoisonError::into_inner);
        quarantine.retain(|path, held| {
            let exists = self
                .executor
                .roots()
                .resolve(path)
                .is_ok_and(|abs| abs.is_file());
            let changed = latest
                .iter()
                .find(|m| &m.path == path)
                .is_some_and(|m| held.hash != Some(m.content_hash));
            if !exists || changed {
                tracing::info!(path = %path, exists, changed, "quarantine released");
            }
            exists && !changed
        });
        quarantine.values().map(|q| q.violation.clone()).collect()
    }

    pub(super) fn is_quarantined(&self, v: &Violation) -> bool {
        let paths = v.subject.paths();
        if paths.is_empty() {
            return false;
        }
        let quarantine = self.quarantine.lock().unwrap_or_else(PoisonError::into_inner);
        paths.iter().any(|p| quarantine.contains_key(*p))
    }

    /// Paths currently quarantined, sorted.
    pub fn quarantined(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .quarantine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        paths.sort();
        paths
    }
}

fn quarantine_violation(path: &str, reason: &str, now: i64) -> Violation {
    let mut v = Violation::reactive(
        ViolationKind::Anomaly,
        Severity::High,
        Subject::File(path.to_string()),
        1.0,
        0.0,
        now,
    );
    v.message = format!("{path} quarantined after corrupt state: {reason}");
    v
}
