//! Orchestrator schedules, supervision limits, and emergency triggers.

use serde::{Deserialize, Serialize};

use super::merge_options;
use crate::constants::{DEFAULT_QUEUE_CAPACITY, DEFAULT_RESULTS_ROOT};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Scan + monitor interval. Default: 300s.
    pub scan_interval_s: Option<u64>,
    /// Pattern detection interval. Default: 600s.
    pub pattern_interval_s: Option<u64>,
    /// SLO sampling interval. Default: 60s.
    pub slo_interval_s: Option<u64>,
    /// Heartbeat interval. Default: 30s.
    pub heartbeat_interval_s: Option<u64>,
    /// Daily report wall-clock time, UTC `HH:MM`. Default: `00:00`.
    pub daily_report_at: Option<String>,
    /// Grace period for workers on shutdown. Default: 30s.
    pub shutdown_deadline_s: Option<u64>,
    /// Capacity of the violation and action queues. Default: 256.
    pub queue_capacity: Option<usize>,
    /// Results root for the store, backups, locks, and reports.
    pub results_root: Option<String>,
}

impl OrchestratorConfig {
    pub fn effective_scan_interval_s(&self) -> u64 {
        self.scan_interval_s.unwrap_or(300)
    }

    pub fn effective_pattern_interval_s(&self) -> u64 {
        self.pattern_interval_s.unwrap_or(600)
    }

    pub fn effective_slo_interval_s(&self) -> u64 {
        self.slo_interval_s.unwrap_or(60)
    }

    pub fn effective_heartbeat_interval_s(&self) -> u64 {
        self.heartbeat_interval_s.unwrap_or(30)
    }

    pub fn effective_daily_report_at(&self) -> String {
        self.daily_report_at
            .clone()
            .unwrap_or_else(|| "00:00".to_string())
    }

    /// Parsed `(hour, minute)` of the daily report.
    pub fn daily_report_time(&self) -> Option<(u32, u32)> {
        parse_hh_mm(&self.effective_daily_report_at())
    }

    pub fn effective_shutdown_deadline_s(&self) -> u64 {
        self.shutdown_deadline_s.unwrap_or(30)
    }

    pub fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY).max(1)
    }

    pub fn effective_results_root(&self) -> String {
        self.results_root
            .clone()
            .unwrap_or_else(|| DEFAULT_RESULTS_ROOT.to_string())
    }

    pub(crate) fn merge(&mut self, other: &OrchestratorConfig) {
        merge_options!(self, other;
            scan_interval_s, pattern_interval_s, slo_interval_s, heartbeat_interval_s,
            daily_report_at, shutdown_deadline_s, queue_capacity, results_root);
    }
}

pub(crate) fn parse_hh_mm(s: &str) -> Option<(u32, u32)> {
    let (h, m) = s.trim().split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    (h < 24 && m < 60).then_some((h, m))
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SupervisionConfig {
    /// Restarts allowed within the window. Default: 3.
    pub max_restarts: Option<u32>,
    /// Restart accounting window. Default: 600s.
    pub restart_window_s: Option<u64>,
    /// Consecutive missed heartbeats before a worker is in error. Default: 2.
    pub missed_beats: Option<u32>,
}

impl SupervisionConfig {
    pub fn effective_max_restarts(&self) -> u32 {
        self.max_restarts.unwrap_or(3)
    }

    pub fn effective_restart_window_s(&self) -> u64 {
        self.restart_window_s.unwrap_or(600)
    }

    pub fn effective_missed_beats(&self) -> u32 {
        self.missed_beats.unwrap_or(2).max(1)
    }

    pub(crate) fn merge(&mut self, other: &SupervisionConfig) {
        merge_options!(self, other; max_restarts, restart_window_s, missed_beats);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EmergencyConfig {
    /// Open Critical violations that trigger emergency mode. Default: 3.
    pub max_open_critical: Option<u32>,
    /// Overall health floor. Default: 0.70.
    pub min_health: Option<f64>,
    /// Emergency when response time exceeds this multiple of its target. Default: 2.0.
    pub response_time_factor: Option<f64>,
}

impl EmergencyConfig {
    pub fn effective_max_open_critical(&self) -> u32 {
        self.max_open_critical.unwrap_or(3).max(1)
    }

    pub fn effective_min_health(&self) -> f64 {
        self.min_health.unwrap_or(0.70)
    }

    pub fn effective_response_time_factor(&self) -> f64 {
        self.response_time_factor.unwrap_or(2.0)
    }

    pub(crate) fn merge(&mut self, other: &EmergencyConfig) {
        merge_options!(self, other; max_open_critical, min_health, response_time_factor);
    }
}
