//! PatternDetector: runs every detector over one input snapshot.
//!
//! Each detector runs behind its own panic boundary; a failing detector is
//! reported as a `DetectionError` and the others still contribute.

use std::panic::{self, AssertUnwindSafe};

use steward_core::config::{DetectorConfig, ThresholdConfig};
use steward_core::constants::ANOMALY_SEED;
use steward_core::errors::{CycleResult, DetectionError};
use steward_core::types::Violation;

use super::anomaly::{self, ForestParams};
use super::clusters;
use super::correlation;
use super::debt;
use super::growth;
use super::performance;
use super::types::{DetectionReport, DetectorInput, GrowthPattern};

/// Anomaly forest sub-sample size.
const SAMPLE_SIZE: usize = 256;

pub struct PatternDetector {
    config: DetectorConfig,
    thresholds: ThresholdConfig,
}

impl PatternDetector {
    pub fn new(config: DetectorConfig, thresholds: ThresholdConfig) -> Self {
        Self { config, thresholds }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Run all detectors. Violations come back sorted by key, so two runs over
    /// the same input are identical.
    pub fn detect(&self, input: &DetectorInput) -> CycleResult<DetectionReport> {
        let mut result = CycleResult::new(DetectionReport::default());
        let mut violations: Vec<Violation> = Vec::new();

        let mut run = |name: &'static str, f: &dyn Fn() -> Vec<Violation>| {
            match panic::catch_unwind(AssertUnwindSafe(f)) {
                Ok(found) => {
                    tracing::debug!(detector = name, count = found.len(), "detector finished");
                    violations.extend(found);
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(detector = name, %message, "detector panicked");
                    result.add_error(DetectionError::DetectorPanic {
                        id: name.to_string(),
                        message,
                    });
                }
            }
        };

        let growth_patterns = self.growth_patterns(input);
        run("growth", &|| {
            let threshold = self.thresholds.effective_max_file_lines();
            let factor = self.config.effective_growth_rate_factor();
            growth_patterns
                .iter()
                .filter_map(|p| growth::growth_violation(p, threshold, factor, input.now))
                .collect()
        });
        run("clusters", &|| {
            let edge = self.config.effective_cluster_edge_threshold();
            clusters::find_clusters(&input.pairs, edge)
                .iter()
                .map(|c| clusters::cluster_violation(c, edge, input.now))
                .collect()
        });
        run("debt", &|| {
            let limit = self.config.effective_debt_slope_per_day();
            let min = self.config.effective_min_samples();
            input
                .file_history
                .values()
                .filter_map(|s| debt::debt_violation(s, limit, min, input.now))
                .collect()
        });
        run("performance", &|| {
            performance::performance_violation(
                &input.system_history,
                self.thresholds.effective_max_cognitive_steps(),
                self.config.effective_performance_slope_per_day(),
                self.config.effective_min_samples(),
                input.now,
            )
            .into_iter()
            .collect()
        });
        run("anomaly", &|| {
            let params = ForestParams {
                trees: self.config.effective_anomaly_trees(),
                sample_size: SAMPLE_SIZE,
                seed: ANOMALY_SEED,
            };
            anomaly::detect_anomalies(
                &input.latest(),
                self.config.effective_contamination(),
                self.config.effective_anomaly_min_files(),
                params,
            )
            .iter()
            .map(|f| anomaly::anomaly_violation(f, input.now))
            .collect()
        });
        run("correlation", &|| {
            let threshold = self.config.effective_correlation_threshold();
            correlation::correlate(&input.violation_counts, threshold)
                .iter()
                .map(|c| correlation::correlation_violation(c, threshold, input.now))
                .collect()
        });

        violations.sort_by(|a, b| a.key().cmp(&b.key()));
        violations.dedup_by(|a, b| a.key() == b.key());
        tracing::info!(detector_violations = violations.len(), "pattern detection complete");

        result.data.violations = violations;
        result.data.growth = growth_patterns;
        result
    }

    fn growth_patterns(&self, input: &DetectorInput) -> Vec<GrowthPattern> {
        let threshold = self.thresholds.effective_max_file_lines();
        let min = self.config.effective_min_samples();
        input
            .file_history
            .values()
            .filter_map(|s| growth::growth_pattern(s, threshold, min))
            .collect()
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
