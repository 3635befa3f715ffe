//! Backup registry.

use rusqlite::{params, Connection, OptionalExtension, Row};
use steward_core::errors::StorageError;
use steward_core::types::BackupRecord;

use crate::sql_err;

fn map_row(row: &Row<'_>) -> rusqlite::Result<BackupRecord> {
    Ok(BackupRecord {
        action_id: row.get(0)?,
        created_at: row.get(1)?,
        location: row.get(2)?,
        file_count: row.get(3)?,
        total_bytes: row.get::<_, i64>(4)? as u64,
        pruned_at: row.get(5)?,
    })
}

pub fn insert(conn: &Connection, b: &BackupRecord) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO backups (action_id, created_at, location, file_count, total_bytes, pruned_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            b.action_id,
            b.created_at,
            b.location,
            b.file_count,
            b.total_bytes as i64,
            b.pruned_at
        ],
    )
    .map_err(sql_err)?;
    Ok(())
}

pub fn get(conn: &Connection, action_id: &str) -> Result<Option<BackupRecord>, StorageError> {
    conn.query_row(
        "SELECT action_id, created_at, location, file_count, total_bytes, pruned_at
         FROM backups WHERE action_id = ?1",
        params![action_id],
        map_row,
    )
    .optional()
    .map_err(sql_err)
}

/// Unpruned backups created strictly before `before`.
pub fn created_before(conn: &Connection, before: i64) -> Result<Vec<BackupRecord>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT action_id, created_at, location, file_count, total_bytes, pruned_at
             FROM backups WHERE pruned_at IS NULL AND created_at < ?1 ORDER BY created_at ASC",
        )
        .map_err(sql_err)?;
    let rows = stmt.query_map(params![before], map_row).map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

pub fn mark_pruned(conn: &Connection, action_id: &str, at: i64) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE backups SET pruned_at = ?2 WHERE action_id = ?1",
        params![action_id, at],
    )
    .map_err(sql_err)?;
    Ok(())
}
