//! Notification sinks and the handler that turns events into alerts.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::json;
use steward_core::events::{
    ActionFailedEvent, EmergencyClearedEvent, EmergencyEnteredEvent, ErrorEvent, GovernanceEventHandler,
    SloBreachedEvent, ViolationOpenedEvent,
};
use steward_core::traits::{Notification, NotificationSink};
use steward_core::types::Severity;

/// Logs every notification through `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn publish(&self, n: &Notification) {
        match n.severity {
            Severity::Critical | Severity::High => {
                tracing::warn!(channel = %n.channel, severity = n.severity.name(), title = %n.title, "{}", n.body)
            }
            _ => tracing::info!(channel = %n.channel, severity = n.severity.name(), title = %n.title, "{}", n.body),
        }
    }
}

/// Appends one JSON object per line.
#[derive(Debug)]
pub struct JsonlFileSink {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl JsonlFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> std::io::Result<File> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(&self.path)
    }
}

impl NotificationSink for JsonlFileSink {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    fn publish(&self, n: &Notification) {
        let line = match serde_json::to_string(n) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "notification not serializable");
                return;
            }
        };
        let mut slot = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            match self.open() {
                Ok(f) => *slot = Some(f),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "notification file unavailable");
                    return;
                }
            }
        }
        if let Some(file) = slot.as_mut() {
            if let Err(e) = writeln!(file, "{line}") {
                tracing::warn!(path = %self.path.display(), error = %e, "notification write failed");
                *slot = None;
            }
        }
    }
}

/// Keeps notifications in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    received: Mutex<Vec<Notification>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<Notification> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn on_channel(&self, channel: &str) -> Vec<Notification> {
        self.received()
            .into_iter()
            .filter(|n| n.channel == channel)
            .collect()
    }
}

impl NotificationSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn publish(&self, n: &Notification) {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(n.clone());
    }
}

/// Publishes alert-worthy governance events to every sink.
///
/// Channels: `slo`, `emergency`, `actions`, `violations` (Critical only),
/// `errors`.
#[derive(Default)]
pub struct AlertRouter {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl AlertRouter {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }

    fn publish(&self, channel: &str, severity: Severity, title: String, body: String, payload: serde_json::Value) {
        let n = Notification {
            channel: channel.to_string(),
            severity,
            title,
            body,
            payload,
        };
        for sink in &self.sinks {
            sink.publish(&n);
        }
    }
}

impl GovernanceEventHandler for AlertRouter {
    fn on_violation_opened(&self, e: &ViolationOpenedEvent) {
        let v = &e.violation;
        if v.severity == Severity::Critical {
            self.publish(
                "violations",
                v.severity,
                format!("critical {} violation", v.kind),
                v.message.clone(),
                json!({ "violation_id": v.id, "subject": v.subject.key() }),
            );
        }
    }

    fn on_action_failed(&self, e: &ActionFailedEvent) {
        self.publish(
            "actions",
            Severity::High,
            format!("{} action failed", e.kind),
            e.reason.clone(),
            json!({ "action_id": e.action_id, "error_code": e.error_code }),
        );
    }

    fn on_slo_breached(&self, e: &SloBreachedEvent) {
        let s = &e.sample;
        self.publish(
            "slo",
            e.severity,
            format!("{} below target", s.metric),
            format!("{} = {:.3} (target {:.3}, deviation {:+.1}%)", s.metric, s.value, s.target, s.deviation * 100.0),
            json!({ "metric": s.metric, "value": s.value, "target": s.target, "deviation": s.deviation }),
        );
    }

    fn on_emergency_entered(&self, e: &EmergencyEnteredEvent) {
        self.publish(
            "emergency",
            Severity::Critical,
            "emergency mode entered".to_string(),
            e.reason.clone(),
            json!({ "entered_at": e.entered_at }),
        );
    }

    fn on_emergency_cleared(&self, e: &EmergencyClearedEvent) {
        self.publish(
            "emergency",
            Severity::Low,
            "emergency mode cleared".to_string(),
            String::new(),
            json!({ "cleared_at": e.cleared_at }),
        );
    }

    fn on_error(&self, e: &ErrorEvent) {
        let severity = if e.fatal { Severity::Critical } else { Severity::Medium };
        self.publish(
            "errors",
            severity,
            format!("{} error in {}", e.error_code, e.worker),
            e.message.clone(),
            json!({ "worker": e.worker, "fatal": e.fatal }),
        );
    }
}
