//! Pattern detector tuning.

use serde::{Deserialize, Serialize};

use super::merge_options;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DetectorConfig {
    /// Fraction of files the anomaly detector may flag. Default: 0.05.
    pub contamination: Option<f64>,
    /// Minimum |r| for a correlation violation. Default: 0.7.
    pub correlation_threshold: Option<f64>,
    /// Minimum similarity for an edge in the duplication graph. Default: 0.15.
    pub cluster_edge_threshold: Option<f64>,
    /// Growth fires when lines/day exceeds this fraction of the size threshold. Default: 0.15.
    pub growth_rate_factor: Option<f64>,
    /// Debt accumulation slope, markers/day. Default: 0.20.
    pub debt_slope_per_day: Option<f64>,
    /// Cognitive steps slope, steps/day. Default: 0.10.
    pub performance_slope_per_day: Option<f64>,
    /// Minimum samples for a trend. Default: 3.
    pub min_samples: Option<usize>,
    /// History window read by detectors, seconds. Default: 30 days.
    pub history_window_s: Option<u64>,
    /// Minimum corpus size for anomaly detection. Default: 8.
    pub anomaly_min_files: Option<usize>,
    /// Trees in the isolation forest. Default: 100.
    pub anomaly_trees: Option<usize>,
}

impl DetectorConfig {
    pub fn effective_contamination(&self) -> f64 {
        self.contamination.unwrap_or(0.05)
    }

    pub fn effective_correlation_threshold(&self) -> f64 {
        self.correlation_threshold.unwrap_or(0.7)
    }

    pub fn effective_cluster_edge_threshold(&self) -> f64 {
        self.cluster_edge_threshold.unwrap_or(0.15)
    }

    pub fn effective_growth_rate_factor(&self) -> f64 {
        self.growth_rate_factor.unwrap_or(0.15)
    }

    pub fn effective_debt_slope_per_day(&self) -> f64 {
        self.debt_slope_per_day.unwrap_or(0.20)
    }

    pub fn effective_performance_slope_per_day(&self) -> f64 {
        self.performance_slope_per_day.unwrap_or(0.10)
    }

    pub fn effective_min_samples(&self) -> usize {
        self.min_samples.unwrap_or(3).max(2)
    }

    pub fn effective_history_window_s(&self) -> u64 {
        self.history_window_s.unwrap_or(30 * 86_400)
    }

    pub fn effective_anomaly_min_files(&self) -> usize {
        self.anomaly_min_files.unwrap_or(8)
    }

    pub fn effective_anomaly_trees(&self) -> usize {
        self.anomaly_trees.unwrap_or(100)
    }

    pub(crate) fn merge(&mut self, other: &DetectorConfig) {
        merge_options!(self, other;
            contamination, correlation_threshold, cluster_edge_threshold, growth_rate_factor,
            debt_slope_per_day, performance_slope_per_day, min_samples, history_window_s,
            anomaly_min_files, anomaly_trees);
    }
}
