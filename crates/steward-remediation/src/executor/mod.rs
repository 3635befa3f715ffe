//! Remediation executor.

pub mod backup;
pub mod locks;
mod recovery;
mod runner;
pub mod types;
pub mod validate;

pub use backup::{BackupStore, RestoreReport, Snapshot};
pub use locks::SubjectLocks;
pub use runner::Executor;
pub use types::{ActionOutcome, ActionReport, ExecutionReport};
