//! Event payloads published to handlers and persisted to the event log.

use serde::{Deserialize, Serialize};

use crate::types::{ActionKind, Severity, SloSample, Subject, Violation, ViolationKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationOpenedEvent {
    pub violation: Violation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationClosedEvent {
    pub violation_id: String,
    pub kind: ViolationKind,
    pub subject: Subject,
    pub closed_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionStartedEvent {
    pub action_id: String,
    pub kind: ActionKind,
    pub subjects: Vec<String>,
    pub started_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionCompletedEvent {
    pub action_id: String,
    pub kind: ActionKind,
    pub finished_at: i64,
    pub duration_s: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionFailedEvent {
    pub action_id: String,
    pub kind: ActionKind,
    pub finished_at: i64,
    pub error_code: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRolledBackEvent {
    pub action_id: String,
    pub kind: ActionKind,
    pub restored_files: usize,
    pub removed_files: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SloBreachedEvent {
    pub sample: SloSample,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyEnteredEvent {
    pub reason: String,
    pub entered_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyClearedEvent {
    pub cleared_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanCompletedEvent {
    pub sampled_at: i64,
    pub file_count: usize,
    pub skipped_files: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub worker: String,
    pub error_code: String,
    pub message: String,
    pub fatal: bool,
}

/// Every event the core publishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum GovernanceEvent {
    #[serde(rename = "violation.opened")]
    ViolationOpened(ViolationOpenedEvent),
    #[serde(rename = "violation.closed")]
    ViolationClosed(ViolationClosedEvent),
    #[serde(rename = "action.started")]
    ActionStarted(ActionStartedEvent),
    #[serde(rename = "action.completed")]
    ActionCompleted(ActionCompletedEvent),
    #[serde(rename = "action.failed")]
    ActionFailed(ActionFailedEvent),
    #[serde(rename = "action.rolled_back")]
    ActionRolledBack(ActionRolledBackEvent),
    #[serde(rename = "slo.breached")]
    SloBreached(SloBreachedEvent),
    #[serde(rename = "emergency.entered")]
    EmergencyEntered(EmergencyEnteredEvent),
    #[serde(rename = "emergency.cleared")]
    EmergencyCleared(EmergencyClearedEvent),
    #[serde(rename = "scan.completed")]
    ScanCompleted(ScanCompletedEvent),
    #[serde(rename = "error")]
    Error(ErrorEvent),
}

impl GovernanceEvent {
    /// Wire name, e.g. `violation.opened`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ViolationOpened(_) => "violation.opened",
            Self::ViolationClosed(_) => "violation.closed",
            Self::ActionStarted(_) => "action.started",
            Self::ActionCompleted(_) => "action.completed",
            Self::ActionFailed(_) => "action.failed",
            Self::ActionRolledBack(_) => "action.rolled_back",
            Self::SloBreached(_) => "slo.breached",
            Self::EmergencyEntered(_) => "emergency.entered",
            Self::EmergencyCleared(_) => "emergency.cleared",
            Self::ScanCompleted(_) => "scan.completed",
            Self::Error(_) => "error",
        }
    }
}
