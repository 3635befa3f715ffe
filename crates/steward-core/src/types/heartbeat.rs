//! Worker heartbeats.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Worker state machine: Starting -> Active <-> Error -> Stopping -> Inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Starting,
    Active,
    Error,
    Stopping,
    Inactive,
}

impl WorkerStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Active => "active",
            Self::Error => "error",
            Self::Stopping => "stopping",
            Self::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [
            Self::Starting,
            Self::Active,
            Self::Error,
            Self::Stopping,
            Self::Inactive,
        ]
        .into_iter()
        .find(|k| k.name() == s)
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsystemHeartbeat {
    pub worker: String,
    pub last_beat_at: i64,
    pub status: WorkerStatus,
    pub error_count: u32,
    pub uptime_seconds: f64,
    pub restart_count: u32,
}
