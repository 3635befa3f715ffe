//! Aggregate error and the recovery taxonomy.

use serde::{Deserialize, Serialize};

use super::error_code::{self, StewardErrorCode};
use super::{
    ConfigError, DetectionError, RemediationError, ScanError, StorageError, SupervisionError,
};

/// Any error that can cross a worker boundary.
#[derive(Debug, thiserror::Error)]
pub enum GovernanceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Detection error: {0}")]
    Detection(#[from] DetectionError),

    #[error("Remediation error: {0}")]
    Remediation(#[from] RemediationError),

    #[error("Supervision error: {0}")]
    Supervision(#[from] SupervisionError),

    #[error("Cancelled")]
    Cancelled,
}

/// How a failure is handled by the worker that observed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Retry with bounded exponential backoff, then surface.
    Transient,
    /// Quarantine the subject and open an anomaly violation; never retried.
    CorruptState,
    /// Roll back and mark the action failed.
    Timeout,
    /// Restart the worker; escalate to emergency beyond the budget.
    Supervision,
    /// Store unavailable or equivalent; the process shuts down.
    Fatal,
    /// Caller error; reported, not retried.
    Permanent,
}

impl GovernanceError {
    /// Maps this error onto the recovery taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Config(_) => ErrorClass::Permanent,
            Self::Scan(e) => match e {
                ScanError::Io { .. } | ScanError::Walk { .. } => ErrorClass::Transient,
                ScanError::Encoding { .. } => ErrorClass::CorruptState,
                ScanError::Timeout { .. } => ErrorClass::Timeout,
                ScanError::RootNotFound { .. } | ScanError::Cancelled => ErrorClass::Permanent,
            },
            Self::Storage(e) => match e {
                StorageError::DbBusy | StorageError::SqliteError { .. } => ErrorClass::Transient,
                StorageError::DbCorrupt { .. }
                | StorageError::DiskFull
                | StorageError::MigrationFailed { .. } => ErrorClass::Fatal,
                _ => ErrorClass::Permanent,
            },
            Self::Detection(_) => ErrorClass::Permanent,
            Self::Remediation(e) => match e {
                RemediationError::LockBusy { .. } | RemediationError::Io { .. } => {
                    ErrorClass::Transient
                }
                RemediationError::Timeout { .. } => ErrorClass::Timeout,
                RemediationError::Corrupt { .. } => ErrorClass::CorruptState,
                _ => ErrorClass::Permanent,
            },
            Self::Supervision(_) => ErrorClass::Supervision,
            Self::Cancelled => ErrorClass::Permanent,
        }
    }

    /// True when a retry with backoff may succeed.
    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

impl StewardErrorCode for GovernanceError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Scan(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
            Self::Detection(e) => e.error_code(),
            Self::Remediation(e) => e.error_code(),
            Self::Supervision(e) => e.error_code(),
            Self::Cancelled => error_code::CANCELLED,
        }
    }
}

/// Result of a cycle that accumulates non-fatal errors next to its data.
#[derive(Debug, Default)]
pub struct CycleResult<T: Default = ()> {
    pub data: T,
    pub errors: Vec<GovernanceError>,
}

impl<T: Default> CycleResult<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: impl Into<GovernanceError>) {
        self.errors.push(error.into());
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}
