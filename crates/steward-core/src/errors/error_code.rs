//! StewardErrorCode trait and stable error code strings.

/// Every error enum implements this to expose a stable, machine-readable code.
/// Codes appear in events, reports, and the process log.
pub trait StewardErrorCode {
    /// Returns the error code string (e.g., "SCAN_ERROR").
    fn error_code(&self) -> &'static str;

    /// Returns `[ERROR_CODE] message`.
    fn coded_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const SCAN_ERROR: &str = "SCAN_ERROR";
pub const SCAN_TIMEOUT: &str = "SCAN_TIMEOUT";
pub const ENCODING_ERROR: &str = "ENCODING_ERROR";
pub const OUTSIDE_ROOTS: &str = "OUTSIDE_ROOTS";
pub const CANCELLED: &str = "CANCELLED";
pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const DB_BUSY: &str = "DB_BUSY";
pub const DB_CORRUPT: &str = "DB_CORRUPT";
pub const DISK_FULL: &str = "DISK_FULL";
pub const MIGRATION_FAILED: &str = "MIGRATION_FAILED";
pub const OUT_OF_ORDER: &str = "OUT_OF_ORDER";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const INVALID_TRANSITION: &str = "INVALID_TRANSITION";
pub const DETECTION_ERROR: &str = "DETECTION_ERROR";
pub const LOCK_BUSY: &str = "LOCK_BUSY";
pub const BACKUP_ERROR: &str = "BACKUP_ERROR";
pub const TRANSFORM_ERROR: &str = "TRANSFORM_ERROR";
pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
pub const ACTION_TIMEOUT: &str = "ACTION_TIMEOUT";
pub const CONVERTER_FAILED: &str = "CONVERTER_FAILED";
pub const CORRUPT_STATE: &str = "CORRUPT_STATE";
pub const EXECUTOR_HALTED: &str = "EXECUTOR_HALTED";
pub const PLAN_NOT_DISPATCHABLE: &str = "PLAN_NOT_DISPATCHABLE";
pub const INTERRUPTED: &str = "INTERRUPTED";
pub const REMEDIATION_ERROR: &str = "REMEDIATION_ERROR";
pub const SUPERVISION_ERROR: &str = "SUPERVISION_ERROR";
pub const RESTART_BUDGET_EXHAUSTED: &str = "RESTART_BUDGET_EXHAUSTED";
