//! Threshold monitor limits.

use serde::{Deserialize, Serialize};

use super::merge_options;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ThresholdConfig {
    /// FileSize fires above this many lines. Default: 1500.
    pub max_file_lines: Option<u32>,
    /// Duplication fires above this pairwise similarity. Default: 0.20.
    pub duplication: Option<f64>,
    /// TechnicalDebt fires above this system-wide marker count. Default: 19.
    pub max_debt_markers: Option<u32>,
    /// NavigationPerformance fires above this many cognitive steps. Default: 2.5.
    pub max_cognitive_steps: Option<f64>,
    /// FormatCompliance fires below this ratio. Default: 0.95.
    pub min_compliance: Option<f64>,
}

impl ThresholdConfig {
    pub fn effective_max_file_lines(&self) -> u32 {
        self.max_file_lines.unwrap_or(1500)
    }

    pub fn effective_duplication(&self) -> f64 {
        self.duplication.unwrap_or(0.20)
    }

    pub fn effective_max_debt_markers(&self) -> u32 {
        self.max_debt_markers.unwrap_or(19)
    }

    pub fn effective_max_cognitive_steps(&self) -> f64 {
        self.max_cognitive_steps.unwrap_or(2.5)
    }

    pub fn effective_min_compliance(&self) -> f64 {
        self.min_compliance.unwrap_or(0.95)
    }

    pub(crate) fn merge(&mut self, other: &ThresholdConfig) {
        merge_options!(self, other;
            max_file_lines, duplication, max_debt_markers, max_cognitive_steps, min_compliance);
    }
}
