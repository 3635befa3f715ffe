//! Worker heartbeats, one row per worker.

use rusqlite::{params, Connection};
use steward_core::errors::StorageError;
use steward_core::types::{SubsystemHeartbeat, WorkerStatus};

use super::enum_col;
use crate::sql_err;

pub fn upsert(conn: &Connection, h: &SubsystemHeartbeat) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO heartbeats (worker, last_beat_at, status, error_count, uptime_seconds, restart_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(worker) DO UPDATE SET
            last_beat_at = excluded.last_beat_at,
            status = excluded.status,
            error_count = excluded.error_count,
            uptime_seconds = excluded.uptime_seconds,
            restart_count = excluded.restart_count",
        params![
            h.worker,
            h.last_beat_at,
            h.status.name(),
            h.error_count,
            h.uptime_seconds,
            h.restart_count
        ],
    )
    .map_err(sql_err)?;
    Ok(())
}

pub fn all(conn: &Connection) -> Result<Vec<SubsystemHeartbeat>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT worker, last_beat_at, status, error_count, uptime_seconds, restart_count
             FROM heartbeats ORDER BY worker ASC",
        )
        .map_err(sql_err)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(SubsystemHeartbeat {
                worker: row.get(0)?,
                last_beat_at: row.get(1)?,
                status: enum_col(row, 2, WorkerStatus::parse)?,
                error_count: row.get(3)?,
                uptime_seconds: row.get(4)?,
                restart_count: row.get(5)?,
            })
        })
        .map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}
