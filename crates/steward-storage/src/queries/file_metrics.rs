//! Per-file metric time series.

use rusqlite::{params, Connection, OptionalExtension, Row};
use steward_core::errors::StorageError;
use steward_core::types::FileMetric;

use crate::sql_err;

const COLUMNS: &str = "path, sampled_at, line_count, char_count, link_count, header_count,
    debt_marker_count, max_header_depth, format_issue_count, has_title, content_hash";

fn map_row(row: &Row<'_>) -> rusqlite::Result<FileMetric> {
    Ok(FileMetric {
        path: row.get(0)?,
        sampled_at: row.get(1)?,
        line_count: row.get(2)?,
        char_count: row.get::<_, i64>(3)? as u64,
        link_count: row.get(4)?,
        header_count: row.get(5)?,
        debt_marker_count: row.get(6)?,
        max_header_depth: row.get(7)?,
        format_issue_count: row.get(8)?,
        has_title: row.get(9)?,
        content_hash: row.get::<_, i64>(10)? as u64,
    })
}

/// Latest `sampled_at` recorded for `path`.
pub fn latest_sampled_at(conn: &Connection, path: &str) -> Result<Option<i64>, StorageError> {
    conn.query_row(
        "SELECT MAX(sampled_at) FROM file_metrics WHERE path = ?1",
        params![path],
        |row| row.get::<_, Option<i64>>(0),
    )
    .map_err(sql_err)
}

/// Append a batch. Each sample must be strictly newer than the latest stored
/// sample for its path.
pub fn insert_batch(conn: &Connection, batch: &[FileMetric]) -> Result<usize, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "INSERT INTO file_metrics ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ))
        .map_err(sql_err)?;
    for m in batch {
        if let Some(latest) = latest_sampled_at(conn, &m.path)? {
            if m.sampled_at <= latest {
                return Err(StorageError::OutOfOrder {
                    entity: "file_metric",
                    key: m.path.clone(),
                    sampled_at: m.sampled_at,
                    latest,
                });
            }
        }
        stmt.execute(params![
            m.path,
            m.sampled_at,
            m.line_count,
            m.char_count as i64,
            m.link_count,
            m.header_count,
            m.debt_marker_count,
            m.max_header_depth,
            m.format_issue_count,
            m.has_title,
            m.content_hash as i64,
        ])
        .map_err(sql_err)?;
    }
    Ok(batch.len())
}

/// Samples of `path` at or after `since`, oldest first.
pub fn history(conn: &Connection, path: &str, since: i64) -> Result<Vec<FileMetric>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {COLUMNS} FROM file_metrics WHERE path = ?1 AND sampled_at >= ?2 ORDER BY sampled_at ASC"
        ))
        .map_err(sql_err)?;
    let rows = stmt
        .query_map(params![path, since], map_row)
        .map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

/// All samples at or after `since`, ordered by path then time.
pub fn all_history(conn: &Connection, since: i64) -> Result<Vec<FileMetric>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {COLUMNS} FROM file_metrics WHERE sampled_at >= ?1 ORDER BY path ASC, sampled_at ASC"
        ))
        .map_err(sql_err)?;
    let rows = stmt.query_map(params![since], map_row).map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

/// Samples written by the scan at `sampled_at`.
pub fn at(conn: &Connection, sampled_at: i64) -> Result<Vec<FileMetric>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {COLUMNS} FROM file_metrics WHERE sampled_at = ?1 ORDER BY path ASC"
        ))
        .map_err(sql_err)?;
    let rows = stmt.query_map(params![sampled_at], map_row).map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

/// Most recent sample of `path`.
pub fn latest(conn: &Connection, path: &str) -> Result<Option<FileMetric>, StorageError> {
    conn.query_row(
        &format!(
            "SELECT {COLUMNS} FROM file_metrics WHERE path = ?1 ORDER BY sampled_at DESC LIMIT 1"
        ),
        params![path],
        map_row,
    )
    .optional()
    .map_err(sql_err)
}

/// Most recent sample of every path, ordered by path.
pub fn latest_all(conn: &Connection) -> Result<Vec<FileMetric>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {COLUMNS} FROM file_metrics f
             WHERE sampled_at = (SELECT MAX(sampled_at) FROM file_metrics WHERE path = f.path)
             ORDER BY path ASC"
        ))
        .map_err(sql_err)?;
    let rows = stmt.query_map([], map_row).map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

pub fn count(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM file_metrics", [], |row| row.get(0))
        .map_err(sql_err)
}
