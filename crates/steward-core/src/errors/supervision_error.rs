//! Worker supervision errors.

use super::error_code::{self, StewardErrorCode};

/// Errors raised by the supervisor while managing worker lifecycles.
#[derive(Debug, thiserror::Error)]
pub enum SupervisionError {
    #[error("Worker {worker} exceeded {max_restarts} restarts within {window_s}s")]
    RestartBudgetExhausted {
        worker: String,
        max_restarts: u32,
        window_s: u64,
    },

    #[error("Worker {worker} panicked: {message}")]
    WorkerPanicked { worker: String, message: String },

    #[error("Failed to spawn worker {worker}: {message}")]
    SpawnFailed { worker: String, message: String },

    #[error("Unknown worker {0}")]
    UnknownWorker(String),

    #[error("Workers still running after {deadline_s}s shutdown deadline: {workers:?}")]
    ShutdownDeadline { deadline_s: u64, workers: Vec<String> },
}

impl StewardErrorCode for SupervisionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::RestartBudgetExhausted { .. } => error_code::RESTART_BUDGET_EXHAUSTED,
            _ => error_code::SUPERVISION_ERROR,
        }
    }
}
