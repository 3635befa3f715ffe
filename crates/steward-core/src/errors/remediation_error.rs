//! Remediation planning and execution errors.

use std::path::PathBuf;

use super::error_code::{self, StewardErrorCode};

/// Errors raised by the executor and its transformations.
#[derive(Debug, thiserror::Error)]
pub enum RemediationError {
    #[error("Path {path} resolves outside the allowed roots")]
    OutsideRoots { path: PathBuf },

    #[error("Lock busy on {path}")]
    LockBusy { path: PathBuf },

    #[error("Failed to lock {path}: {message}")]
    Lock { path: PathBuf, message: String },

    #[error("Backup for action {action_id} failed: {message}")]
    Backup { action_id: String, message: String },

    #[error("I/O error on {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("{kind} transform failed: {message}")]
    Transform { kind: &'static str, message: String },

    #[error("Success criterion '{criterion}' not met: {detail}")]
    ValidationFailed { criterion: String, detail: String },

    #[error("Action {action_id} exceeded {timeout_s}s")]
    Timeout { action_id: String, timeout_s: f64 },

    #[error("Converter failed (exit {exit_code:?}): {message}")]
    Converter {
        exit_code: Option<i32>,
        message: String,
    },

    #[error("Corrupt subject {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Action {action_id} panicked: {message}")]
    Panicked { action_id: String, message: String },

    #[error("Plan {plan_id} is {status} and cannot be dispatched")]
    NotDispatchable { plan_id: String, status: &'static str },

    #[error("Executor halted")]
    Halted,

    #[error("Action cancelled")]
    Cancelled,
}

impl StewardErrorCode for RemediationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::OutsideRoots { .. } => error_code::OUTSIDE_ROOTS,
            Self::LockBusy { .. } => error_code::LOCK_BUSY,
            Self::Backup { .. } => error_code::BACKUP_ERROR,
            Self::Transform { .. } => error_code::TRANSFORM_ERROR,
            Self::ValidationFailed { .. } => error_code::VALIDATION_FAILED,
            Self::Timeout { .. } => error_code::ACTION_TIMEOUT,
            Self::Converter { .. } => error_code::CONVERTER_FAILED,
            Self::Corrupt { .. } => error_code::CORRUPT_STATE,
            Self::NotDispatchable { .. } => error_code::PLAN_NOT_DISPATCHABLE,
            Self::Halted => error_code::EXECUTOR_HALTED,
            Self::Cancelled => error_code::CANCELLED,
            Self::Lock { .. } | Self::Io { .. } | Self::Panicked { .. } => {
                error_code::REMEDIATION_ERROR
            }
        }
    }
}
