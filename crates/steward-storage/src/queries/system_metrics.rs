//! System-wide metric series.

use rusqlite::{params, Connection, OptionalExtension, Row};
use steward_core::errors::StorageError;
use steward_core::types::SystemMetric;

use crate::sql_err;

const COLUMNS: &str = "sampled_at, file_count, total_lines, duplication_ratio, cognitive_steps,
    compliance_ratio, debt_marker_total, scan_duration_ms, skipped_files, root_document_present,
    cycle_errors";

fn map_row(row: &Row<'_>) -> rusqlite::Result<SystemMetric> {
    Ok(SystemMetric {
        sampled_at: row.get(0)?,
        file_count: row.get(1)?,
        total_lines: row.get::<_, i64>(2)? as u64,
        duplication_ratio: row.get(3)?,
        cognitive_steps: row.get(4)?,
        compliance_ratio: row.get(5)?,
        debt_marker_total: row.get(6)?,
        scan_duration_ms: row.get::<_, i64>(7)? as u64,
        skipped_files: row.get(8)?,
        root_document_present: row.get(9)?,
        cycle_errors: row.get(10)?,
    })
}

pub fn insert(conn: &Connection, m: &SystemMetric) -> Result<(), StorageError> {
    let latest: Option<i64> = conn
        .query_row("SELECT MAX(sampled_at) FROM system_metrics", [], |row| row.get(0))
        .map_err(sql_err)?;
    if let Some(latest) = latest {
        if m.sampled_at <= latest {
            return Err(StorageError::OutOfOrder {
                entity: "system_metric",
                key: "<system>".to_string(),
                sampled_at: m.sampled_at,
                latest,
            });
        }
    }
    conn.execute(
        &format!("INSERT INTO system_metrics ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
        params![
            m.sampled_at,
            m.file_count,
            m.total_lines as i64,
            m.duplication_ratio,
            m.cognitive_steps,
            m.compliance_ratio,
            m.debt_marker_total,
            m.scan_duration_ms as i64,
            m.skipped_files,
            m.root_document_present,
            m.cycle_errors,
        ],
    )
    .map_err(sql_err)?;
    Ok(())
}

pub fn latest(conn: &Connection) -> Result<Option<SystemMetric>, StorageError> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM system_metrics ORDER BY sampled_at DESC LIMIT 1"),
        [],
        map_row,
    )
    .optional()
    .map_err(sql_err)
}

/// Samples at or after `since`, oldest first.
pub fn history(conn: &Connection, since: i64) -> Result<Vec<SystemMetric>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {COLUMNS} FROM system_metrics WHERE sampled_at >= ?1 ORDER BY sampled_at ASC"
        ))
        .map_err(sql_err)?;
    let rows = stmt.query_map(params![since], map_row).map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}
