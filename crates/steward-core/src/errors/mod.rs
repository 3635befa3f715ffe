//! Error handling for Steward.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod config_error;
pub mod detection_error;
pub mod error_code;
pub mod governance_error;
pub mod remediation_error;
pub mod scan_error;
pub mod storage_error;
pub mod supervision_error;

pub use config_error::ConfigError;
pub use detection_error::DetectionError;
pub use error_code::StewardErrorCode;
pub use governance_error::{CycleResult, ErrorClass, GovernanceError};
pub use remediation_error::RemediationError;
pub use scan_error::ScanError;
pub use storage_error::StorageError;
pub use supervision_error::SupervisionError;
