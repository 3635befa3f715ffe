//! SLO targets and metric store retention.

use serde::{Deserialize, Serialize};

use super::merge_options;
use crate::types::SloMetric;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SloConfig {
    /// Evaluation window. Default: 86400s.
    pub window_s: Option<u64>,
    pub prevention_rate_target: Option<f64>,
    pub response_time_target_s: Option<f64>,
    pub reliability_target: Option<f64>,
    pub compliance_target: Option<f64>,
    pub cognitive_steps_target: Option<f64>,
}

impl SloConfig {
    pub fn effective_window_s(&self) -> u64 {
        self.window_s.unwrap_or(86_400)
    }

    pub fn target(&self, metric: SloMetric) -> f64 {
        match metric {
            SloMetric::PreventionRate => self.prevention_rate_target.unwrap_or(0.95),
            SloMetric::ResponseTime => self.response_time_target_s.unwrap_or(300.0),
            SloMetric::SystemReliability => self.reliability_target.unwrap_or(0.995),
            SloMetric::ComplianceRatio => self.compliance_target.unwrap_or(0.95),
            SloMetric::CognitiveSteps => self.cognitive_steps_target.unwrap_or(2.5),
        }
    }

    pub(crate) fn merge(&mut self, other: &SloConfig) {
        merge_options!(self, other;
            window_s, prevention_rate_target, response_time_target_s, reliability_target,
            compliance_target, cognitive_steps_target);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Raw samples kept per path before rollup. Default: 50.
    pub keep_per_path: Option<u32>,
    /// Raw samples younger than this are never rolled up. Default: 7 days.
    pub rollup_after_days: Option<u32>,
    /// Read connections. Default: 2.
    pub read_pool_size: Option<usize>,
}

impl StorageConfig {
    pub fn effective_keep_per_path(&self) -> u32 {
        self.keep_per_path.unwrap_or(50)
    }

    pub fn effective_rollup_after_days(&self) -> u32 {
        self.rollup_after_days.unwrap_or(7)
    }

    pub fn effective_read_pool_size(&self) -> usize {
        self.read_pool_size.unwrap_or(2).max(1)
    }

    pub(crate) fn merge(&mut self, other: &StorageConfig) {
        merge_options!(self, other; keep_per_path, rollup_after_days, read_pool_size);
    }
}
