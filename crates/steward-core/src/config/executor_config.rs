//! Planner, executor, and backup configuration.

use serde::{Deserialize, Serialize};

use super::merge_options;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Concurrent actions. Default: 3.
    pub max_concurrent: Option<usize>,
    /// Fixed per-action timeout. Default: estimated duration + 60s.
    pub per_action_timeout_s: Option<f64>,
    /// Plans below this confidence need approval. Default: 0.80.
    pub confidence_gate: Option<f64>,
    /// External converter: program followed by arguments; the file path is appended.
    /// Empty means the built-in normalizer.
    pub converter_command: Vec<String>,
    /// Converter wall-clock timeout. Default: 60s.
    pub converter_timeout_s: Option<u64>,
    /// Attempts to acquire busy locks before leaving the action pending. Default: 5.
    pub max_deferrals: Option<u32>,
    /// First deferral delay, doubled on each attempt. Default: 200ms.
    pub defer_backoff_ms: Option<u64>,
    /// Deferral delay cap. Default: 5000ms.
    pub max_backoff_ms: Option<u64>,
    /// Allowed growth of total lines produced by Modularize. Default: 1.20.
    pub modularize_output_factor: Option<f64>,
}

impl ExecutorConfig {
    pub fn effective_max_concurrent(&self) -> usize {
        self.max_concurrent.unwrap_or(3).max(1)
    }

    /// Timeout for one action given its estimate.
    pub fn effective_timeout_s(&self, estimated_duration_s: f64) -> f64 {
        self.per_action_timeout_s
            .unwrap_or(estimated_duration_s + 60.0)
    }

    pub fn effective_confidence_gate(&self) -> f64 {
        self.confidence_gate.unwrap_or(0.80)
    }

    pub fn effective_converter_timeout_s(&self) -> u64 {
        self.converter_timeout_s.unwrap_or(60)
    }

    pub fn effective_max_deferrals(&self) -> u32 {
        self.max_deferrals.unwrap_or(5)
    }

    pub fn effective_defer_backoff_ms(&self) -> u64 {
        self.defer_backoff_ms.unwrap_or(200)
    }

    pub fn effective_max_backoff_ms(&self) -> u64 {
        self.max_backoff_ms.unwrap_or(5_000)
    }

    pub fn effective_modularize_output_factor(&self) -> f64 {
        self.modularize_output_factor.unwrap_or(1.20)
    }

    pub(crate) fn merge(&mut self, other: &ExecutorConfig) {
        merge_options!(self, other;
            max_concurrent, per_action_timeout_s, confidence_gate, converter_timeout_s,
            max_deferrals, defer_backoff_ms, max_backoff_ms, modularize_output_factor);
        if !other.converter_command.is_empty() {
            self.converter_command = other.converter_command.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PlannerConfig {
    /// Dispatch plans regardless of the confidence gate. Default: false.
    pub auto_execute: Option<bool>,
}

impl PlannerConfig {
    pub fn effective_auto_execute(&self) -> bool {
        self.auto_execute.unwrap_or(false)
    }

    pub(crate) fn merge(&mut self, other: &PlannerConfig) {
        merge_options!(self, other; auto_execute);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BackupConfig {
    /// Minimum age in days before a backup may be pruned. Default: 30.
    pub retention_days: Option<u32>,
}

impl BackupConfig {
    pub fn effective_retention_days(&self) -> u32 {
        self.retention_days.unwrap_or(30)
    }

    pub(crate) fn merge(&mut self, other: &BackupConfig) {
        merge_options!(self, other; retention_days);
    }
}
