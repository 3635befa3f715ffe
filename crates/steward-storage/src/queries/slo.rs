//! SLO samples. Per metric, samples are totally ordered by `sampled_at`.

use rusqlite::{params, Connection, Row};
use steward_core::errors::StorageError;
use steward_core::types::{SloMetric, SloSample};

use super::enum_col;
use crate::sql_err;

fn map_row(row: &Row<'_>) -> rusqlite::Result<SloSample> {
    Ok(SloSample {
        metric: enum_col(row, 0, SloMetric::parse)?,
        sampled_at: row.get(1)?,
        value: row.get(2)?,
        target: row.get(3)?,
        compliant: row.get(4)?,
        deviation: row.get(5)?,
    })
}

pub fn insert(conn: &Connection, s: &SloSample) -> Result<(), StorageError> {
    let latest: Option<i64> = conn
        .query_row(
            "SELECT MAX(sampled_at) FROM slo_samples WHERE metric = ?1",
            params![s.metric.name()],
            |row| row.get(0),
        )
        .map_err(sql_err)?;
    if let Some(latest) = latest {
        if s.sampled_at <= latest {
            return Err(StorageError::OutOfOrder {
                entity: "slo_sample",
                key: s.metric.name().to_string(),
                sampled_at: s.sampled_at,
                latest,
            });
        }
    }
    conn.execute(
        "INSERT INTO slo_samples (metric, sampled_at, value, target, compliant, deviation)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![s.metric.name(), s.sampled_at, s.value, s.target, s.compliant, s.deviation],
    )
    .map_err(sql_err)?;
    Ok(())
}

/// Samples of `metric` at or after `since`, in persistence order.
pub fn recent(conn: &Connection, metric: SloMetric, since: i64) -> Result<Vec<SloSample>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT metric, sampled_at, value, target, compliant, deviation FROM slo_samples
             WHERE metric = ?1 AND sampled_at >= ?2 ORDER BY rowid ASC",
        )
        .map_err(sql_err)?;
    let rows = stmt
        .query_map(params![metric.name(), since], map_row)
        .map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

/// Latest sample of each metric.
pub fn latest_per_metric(conn: &Connection) -> Result<Vec<SloSample>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT s.metric, s.sampled_at, s.value, s.target, s.compliant, s.deviation
             FROM slo_samples s
             JOIN (SELECT metric, MAX(sampled_at) AS m FROM slo_samples GROUP BY metric) l
               ON s.metric = l.metric AND s.sampled_at = l.m
             ORDER BY s.metric ASC",
        )
        .map_err(sql_err)?;
    let rows = stmt.query_map([], map_row).map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}
