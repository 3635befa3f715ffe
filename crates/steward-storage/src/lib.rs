//! Steward metric store: SQLite in WAL mode, one serialized writer, pooled readers.
//!
//! The store exclusively owns persistence. Every write runs in a single
//! `BEGIN IMMEDIATE` transaction, so readers never observe partial writes.

pub mod connection;
pub mod migrations;
pub mod queries;
pub mod retention;
pub mod store;

pub use connection::DatabaseManager;
pub use retention::{RollupPolicy, RollupReport};
pub use store::MetricStore;

use steward_core::errors::StorageError;

/// Map a rusqlite error onto the storage taxonomy.
pub(crate) fn sql_err(e: rusqlite::Error) -> StorageError {
    use rusqlite::ErrorCode;
    if let rusqlite::Error::SqliteFailure(ref failure, _) = e {
        match failure.code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => return StorageError::DbBusy,
            ErrorCode::DiskFull => return StorageError::DiskFull,
            ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase => {
                return StorageError::DbCorrupt {
                    details: e.to_string(),
                }
            }
            _ => {}
        }
    }
    StorageError::SqliteError {
        message: e.to_string(),
    }
}

pub(crate) fn json_err(e: serde_json::Error) -> StorageError {
    StorageError::Serialization {
        message: e.to_string(),
    }
}
