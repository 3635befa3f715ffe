//! Outbound notification seam.

use serde::{Deserialize, Serialize};

use crate::types::Severity;

/// One notification. Delivery is best effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub channel: String,
    pub severity: Severity,
    pub title: String,
    pub body: String,
    pub payload: serde_json::Value,
}

/// Publishes notifications to an external transport. Implementations must not
/// block the caller for long and must swallow their own delivery failures.
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &'static str;
    fn publish(&self, notification: &Notification);
}
