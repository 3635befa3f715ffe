//! Schema migrations using PRAGMA user_version.

pub mod v001_metrics;
pub mod v002_remediation;
pub mod v003_rollup_events;

use rusqlite::Connection;
use steward_core::errors::StorageError;

/// Latest schema version.
pub const LATEST_VERSION: u32 = 3;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    let current_version = current_version(conn)?;

    let migrations: &[(&str, u32)] = &[
        (v001_metrics::MIGRATION_SQL, 1),
        (v002_remediation::MIGRATION_SQL, 2),
        (v003_rollup_events::MIGRATION_SQL, 3),
    ];

    for (sql, version) in migrations {
        if current_version < *version {
            conn.execute_batch(sql)
                .map_err(|e| StorageError::MigrationFailed {
                    version: *version,
                    message: e.to_string(),
                })?;
            conn.pragma_update(None, "user_version", version)
                .map_err(|e| StorageError::MigrationFailed {
                    version: *version,
                    message: e.to_string(),
                })?;
            tracing::info!(version = version, "applied migration");
        }
    }
    Ok(())
}

/// Current schema version.
pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| StorageError::MigrationFailed {
            version: 0,
            message: e.to_string(),
        })
}
