//! Steward runtime: the orchestrator that supervises scanning, detection,
//! planning, execution, SLO tracking and reporting as long-running workers.

pub mod event_log;
pub mod health;
pub mod notify;
pub mod orchestrator;
pub mod reports;
pub mod slo;
pub mod supervisor;

pub use health::{overall_health, HealthScore};
pub use orchestrator::{CycleSummary, Orchestrator, RunOutcome};
pub use slo::SloTracker;
pub use supervisor::{SupervisionReport, Supervisor, Worker};
