//! Post-condition checks.
//!
//! Criteria are evaluated against the corpus as the transform left it, with
//! baselines read from the action's snapshot. The first failing criterion is
//! reported; the executor then rolls back.

use rustc_hash::FxHashSet;
use steward_analysis::monitor::cognitive_steps;
use steward_analysis::monitor::similarity::similarity;
use steward_analysis::scanner::markdown::{analyze, debt_markers, links, normalize};
use steward_analysis::scanner::RootDocumentProfile;
use steward_core::errors::RemediationError;
use steward_core::types::SuccessCriterion;
use steward_core::AllowedRoots;

use super::backup::Snapshot;
use crate::fsutil::read_text;
use crate::transforms::consolidate::consolidated_path;
use crate::transforms::convert_format::normalize_document;
use crate::transforms::links::resolve;
use crate::transforms::{EmergencyLatch, TransformOutput};

pub struct Validator<'a> {
    pub roots: &'a AllowedRoots,
    pub snapshot: &'a Snapshot,
    pub output: &'a TransformOutput,
    pub latch: &'a EmergencyLatch,
}

fn failed(criterion: &SuccessCriterion, detail: impl Into<String>) -> RemediationError {
    RemediationError::ValidationFailed {
        criterion: criterion.name().to_string(),
        detail: detail.into(),
    }
}

impl Validator<'_> {
    pub fn check_all(&self, criteria: &[SuccessCriterion]) -> Result<(), RemediationError> {
        for criterion in criteria {
            self.check(criterion)?;
            tracing::trace!(criterion = criterion.name(), "criterion met");
        }
        Ok(())
    }

    fn current(&self, rel: &str) -> Result<String, RemediationError> {
        let abs = self.roots.resolve(rel)?;
        Ok(normalize(&read_text(&abs)?))
    }

    fn original(&self, criterion: &SuccessCriterion, rel: &str) -> Result<String, RemediationError> {
        self.snapshot
            .original_text(rel)
            .map(|t| normalize(&t))
            .ok_or_else(|| failed(criterion, format!("no baseline for {rel}")))
    }

    fn exists(&self, rel: &str) -> bool {
        self.roots.resolve(rel).is_ok_and(|abs| abs.is_file())
    }

    pub fn check(&self, criterion: &SuccessCriterion) -> Result<(), RemediationError> {
        match criterion {
            SuccessCriterion::LineCountAtMost { path, max } => {
                let lines = self.current(path)?.lines().count();
                if lines > *max as usize {
                    return Err(failed(criterion, format!("{path} has {lines} lines, limit {max}")));
                }
            }
            SuccessCriterion::TotalOutputLinesAtMost { path, factor } => {
                let before = self.original(criterion, path)?.lines().count();
                let mut after = self.current(path)?.lines().count();
                for rel in &self.output.created {
                    after += self.current(rel)?.lines().count();
                }
                let limit = (before as f64 * factor).ceil() as usize;
                if after > limit {
                    return Err(failed(
                        criterion,
                        format!("{after} output lines from {before} exceeds {limit}"),
                    ));
                }
            }
            SuccessCriterion::SectionsLinkedExactlyOnce { path } => {
                let text = self.current(path)?;
                let targets: Vec<String> = links(&text)
                    .iter()
                    .filter_map(|l| resolve(path, &l.target))
                    .collect();
                for rel in &self.output.created {
                    let n = targets.iter().filter(|t| *t == rel).count();
                    if n != 1 {
                        return Err(failed(criterion, format!("{rel} linked {n} times from {path}")));
                    }
                }
            }
            SuccessCriterion::NoDanglingLinks { path } => {
                // Links already present before the transform are not its doing.
                let before: FxHashSet<String> = self
                    .snapshot
                    .original_text(path)
                    .map(|t| links(&t).into_iter().map(|l| l.target).collect())
                    .unwrap_or_default();
                let mut documents = vec![(path.clone(), self.current(path)?, true)];
                for rel in &self.output.created {
                    documents.push((rel.clone(), self.current(rel)?, false));
                }
                for (from, text, filter_old) in &documents {
                    for link in links(text) {
                        if *filter_old && before.contains(&link.target) {
                            continue;
                        }
                        if let Some(target) = resolve(from, &link.target) {
                            if !self.exists(&target) {
                                return Err(failed(
                                    criterion,
                                    format!("{from}:{} links missing {target}", link.line + 1),
                                ));
                            }
                        }
                    }
                }
            }
            SuccessCriterion::DebtStrictlyDecreases { path } => {
                let before = debt_markers(&self.original(criterion, path)?).len();
                let after = debt_markers(&self.current(path)?).len();
                if after >= before {
                    return Err(failed(criterion, format!("{path} debt {before} -> {after}")));
                }
            }
            SuccessCriterion::SimilarityBelow { a, b, threshold } => {
                let score = similarity(&self.current(a)?, &self.current(b)?);
                if score >= *threshold {
                    return Err(failed(
                        criterion,
                        format!("similarity({a}, {b}) = {score:.3}, limit {threshold}"),
                    ));
                }
            }
            SuccessCriterion::ConsolidatedFileReferenced { a, b } => {
                let target = consolidated_path(a, b)
                    .ok_or_else(|| failed(criterion, "no consolidated path"))?;
                if !self.exists(&target) {
                    return Err(failed(criterion, format!("{target} was not created")));
                }
                for from in [a, b] {
                    let text = self.current(from)?;
                    let linked = links(&text)
                        .iter()
                        .any(|l| resolve(from, &l.target).as_deref() == Some(target.as_str()));
                    if !linked {
                        return Err(failed(criterion, format!("{from} does not link {target}")));
                    }
                }
            }
            SuccessCriterion::CognitiveStepsAtMost { path, max } => {
                let stats = analyze(&self.current(path)?);
                let steps = cognitive_steps(&RootDocumentProfile {
                    path: path.clone(),
                    header_count: stats.header_count,
                    link_count: stats.link_count,
                    max_header_depth: stats.max_header_depth,
                    quick_nav_present: stats.quick_nav_present,
                });
                if steps > *max {
                    return Err(failed(criterion, format!("{steps:.2} cognitive steps, limit {max}")));
                }
            }
            SuccessCriterion::Idempotent { path } => {
                let text = self.current(path)?;
                if normalize_document(path, &text) != text {
                    return Err(failed(criterion, format!("second pass changes {path}")));
                }
            }
            SuccessCriterion::EmergencyLatched => {
                if !self.latch.is_set() {
                    return Err(failed(criterion, "latch not set"));
                }
            }
        }
        Ok(())
    }
}
