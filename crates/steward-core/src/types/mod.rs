//! Domain types shared by every Steward crate.

pub mod action;
pub mod backup;
pub mod collections;
pub mod heartbeat;
pub mod metrics;
pub mod slo;
pub mod violation;

pub use action::{Action, ActionKind, ActionPlan, ActionStatus, PlanStatus, SuccessCriterion};
pub use backup::BackupRecord;
pub use heartbeat::{SubsystemHeartbeat, WorkerStatus};
pub use metrics::{FileMetric, SystemMetric};
pub use slo::{Direction, SloMetric, SloSample};
pub use violation::{Severity, Subject, Violation, ViolationKind};
