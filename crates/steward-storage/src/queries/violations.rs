//! Violation records. Rows are immutable apart from `closed_at`.

use rusqlite::{params, Connection, OptionalExtension, Row};
use steward_core::errors::StorageError;
use steward_core::types::{Severity, Violation, ViolationKind};

use super::{enum_col, json_col};
use crate::{json_err, sql_err};

const COLUMNS: &str = "id, detected_at, kind, severity, subject, current_value, threshold_value,
    predictive, confidence, time_to_breach, message, closed_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<Violation> {
    Ok(Violation {
        id: row.get(0)?,
        detected_at: row.get(1)?,
        kind: enum_col(row, 2, ViolationKind::parse)?,
        severity: enum_col(row, 3, Severity::parse)?,
        subject: json_col(row, 4)?,
        current_value: row.get(5)?,
        threshold_value: row.get(6)?,
        predictive: row.get(7)?,
        confidence: row.get(8)?,
        time_to_breach: row.get(9)?,
        message: row.get(10)?,
        closed_at: row.get(11)?,
    })
}

/// Insert a violation. Returns false when a row with the same id exists.
pub fn insert(conn: &Connection, v: &Violation) -> Result<bool, StorageError> {
    let subject = serde_json::to_string(&v.subject).map_err(json_err)?;
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO violations (id, detected_at, kind, severity, subject_key, subject,
                current_value, threshold_value, predictive, confidence, time_to_breach, message, closed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                v.id,
                v.detected_at,
                v.kind.name(),
                v.severity.name(),
                v.subject.key(),
                subject,
                v.current_value,
                v.threshold_value,
                v.predictive,
                v.confidence,
                v.time_to_breach,
                v.message,
                v.closed_at,
            ],
        )
        .map_err(sql_err)?;
    Ok(inserted == 1)
}

/// Close an open violation. Closing an already-closed violation is a no-op.
pub fn close(conn: &Connection, id: &str, closed_at: i64) -> Result<(), StorageError> {
    let updated = conn
        .execute(
            "UPDATE violations SET closed_at = ?2 WHERE id = ?1 AND closed_at IS NULL",
            params![id, closed_at],
        )
        .map_err(sql_err)?;
    if updated == 0 && get(conn, id)?.is_none() {
        return Err(StorageError::NotFound {
            entity: "violation",
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn get(conn: &Connection, id: &str) -> Result<Option<Violation>, StorageError> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM violations WHERE id = ?1"),
        params![id],
        map_row,
    )
    .optional()
    .map_err(sql_err)
}

pub fn open(conn: &Connection) -> Result<Vec<Violation>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {COLUMNS} FROM violations WHERE closed_at IS NULL ORDER BY detected_at ASC, id ASC"
        ))
        .map_err(sql_err)?;
    let rows = stmt.query_map([], map_row).map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

/// Violations detected at or after `since`, open or closed.
pub fn opened_since(conn: &Connection, since: i64) -> Result<Vec<Violation>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {COLUMNS} FROM violations WHERE detected_at >= ?1 ORDER BY detected_at ASC, id ASC"
        ))
        .map_err(sql_err)?;
    let rows = stmt.query_map(params![since], map_row).map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

/// `(kind, epoch_day, count)` of violations detected at or after `since`.
pub fn daily_counts(conn: &Connection, since: i64) -> Result<Vec<(ViolationKind, i64, u32)>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT kind, detected_at / 86400 AS day, COUNT(*) FROM violations
             WHERE detected_at >= ?1 GROUP BY kind, day ORDER BY day ASC, kind ASC",
        )
        .map_err(sql_err)?;
    let rows = stmt
        .query_map(params![since], |row| {
            Ok((enum_col(row, 0, ViolationKind::parse)?, row.get(1)?, row.get(2)?))
        })
        .map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}
