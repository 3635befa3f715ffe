//! Metric store errors.

use super::error_code::{self, StewardErrorCode};

/// Errors surfaced by the metric store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("Database busy")]
    DbBusy,

    #[error("Database corrupt: {details}")]
    DbCorrupt { details: String },

    #[error("Disk full")]
    DiskFull,

    #[error("Migration to v{version} failed: {message}")]
    MigrationFailed { version: u32, message: String },

    #[error("Out-of-order {entity} sample for {key}: {sampled_at} <= latest {latest}")]
    OutOfOrder {
        entity: &'static str,
        key: String,
        sampled_at: i64,
        latest: i64,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid status transition for action {id}: {from} -> {to}")]
    InvalidTransition { id: String, from: String, to: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl StewardErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::DbBusy => error_code::DB_BUSY,
            Self::DbCorrupt { .. } => error_code::DB_CORRUPT,
            Self::DiskFull => error_code::DISK_FULL,
            Self::MigrationFailed { .. } => error_code::MIGRATION_FAILED,
            Self::OutOfOrder { .. } => error_code::OUT_OF_ORDER,
            Self::NotFound { .. } => error_code::NOT_FOUND,
            Self::InvalidTransition { .. } => error_code::INVALID_TRANSITION,
            Self::SqliteError { .. } | Self::Serialization { .. } => error_code::STORAGE_ERROR,
        }
    }
}
