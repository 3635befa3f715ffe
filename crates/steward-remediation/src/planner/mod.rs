//! Remediation planner: maps open violations to one ordered, gated plan.

pub mod confidence;
mod planner;

pub use planner::{PlanContext, RemediationPlanner, GROWTH_ACTION_FRACTION, MAX_DEBT_SUBJECTS};
