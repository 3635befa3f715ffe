//! Threshold monitor: reactive violations from the latest snapshot.

use steward_core::config::ThresholdConfig;
use steward_core::types::{Severity, Subject, SystemMetric, Violation, ViolationKind};

use super::similarity::SimilarityPair;
use crate::scanner::ScanSnapshot;

/// Compares one snapshot against the configured limits.
#[derive(Debug, Clone, Default)]
pub struct ThresholdMonitor {
    config: ThresholdConfig,
}

impl ThresholdMonitor {
    pub fn new(config: ThresholdConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// Reactive violations, one per kind per subject, sorted by key.
    pub fn evaluate(
        &self,
        snapshot: &ScanSnapshot,
        pairs: &[SimilarityPair],
        system: &SystemMetric,
    ) -> Vec<Violation> {
        let now = snapshot.sampled_at;
        let mut out = Vec::new();

        let max_lines = self.config.effective_max_file_lines();
        for file in &snapshot.files {
            let m = &file.metric;
            if !m.is_empty() && m.line_count > max_lines {
                out.push(
                    Violation::reactive(
                        ViolationKind::FileSize,
                        Severity::High,
                        Subject::File(m.path.clone()),
                        f64::from(m.line_count),
                        f64::from(max_lines),
                        now,
                    )
                    .with_message(format!("{} has {} lines (limit {max_lines})", m.path, m.line_count)),
                );
            }
        }

        let dup = self.config.effective_duplication();
        for pair in pairs.iter().filter(|p| p.score > dup) {
            out.push(
                Violation::reactive(
                    ViolationKind::Duplication,
                    Severity::Medium,
                    Subject::pair(pair.a.clone(), pair.b.clone()),
                    pair.score,
                    dup,
                    now,
                )
                .with_message(format!("{} and {} are {:.0}% similar", pair.a, pair.b, pair.score * 100.0)),
            );
        }

        let max_debt = self.config.effective_max_debt_markers();
        if system.debt_marker_total > max_debt {
            out.push(
                Violation::reactive(
                    ViolationKind::TechnicalDebt,
                    Severity::High,
                    Subject::System,
                    f64::from(system.debt_marker_total),
                    f64::from(max_debt),
                    now,
                )
                .with_message(format!("{} debt markers in the corpus (limit {max_debt})", system.debt_marker_total)),
            );
        }

        let max_steps = self.config.effective_max_cognitive_steps();
        if system.root_document_present && system.cognitive_steps > max_steps {
            out.push(
                Violation::reactive(
                    ViolationKind::NavigationPerformance,
                    Severity::Critical,
                    Subject::System,
                    system.cognitive_steps,
                    max_steps,
                    now,
                )
                .with_message(format!("navigation takes {:.2} cognitive steps (limit {max_steps})", system.cognitive_steps)),
            );
        }

        let min_compliance = self.config.effective_min_compliance();
        if system.compliance_ratio < min_compliance {
            out.push(
                Violation::reactive(
                    ViolationKind::FormatCompliance,
                    Severity::High,
                    Subject::System,
                    system.compliance_ratio,
                    min_compliance,
                    now,
                )
                .with_message(format!("{:.1}% of files are compliant", system.compliance_ratio * 100.0)),
            );
        }

        if !system.root_document_present {
            out.push(
                Violation::reactive(
                    ViolationKind::SystemStale,
                    Severity::Critical,
                    Subject::System,
                    0.0,
                    1.0,
                    now,
                )
                .with_message("root navigation document is missing"),
            );
        }

        out.sort_by(|a, b| a.key().cmp(&b.key()));
        tracing::debug!(monitor_violations = out.len(), "threshold evaluation complete");
        out
    }
}
