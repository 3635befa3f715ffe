//! Steward remediation: turns violations into action plans and applies them.
//!
//! The planner is pure. The executor is the only component that writes to the
//! corpus, and every write goes through lock, snapshot, transform, validate,
//! then commit or roll back.

pub mod executor;
mod fsutil;
pub mod planner;
pub mod transforms;

pub use executor::{ActionOutcome, ActionReport, BackupStore, ExecutionReport, Executor};
pub use planner::{PlanContext, RemediationPlanner};
pub use transforms::{EmergencyLatch, TransformContext, TransformOutput};
