//! Retention for the file metric series.
//!
//! The newest `keep_per_path` raw samples of every path are always kept, as is
//! anything younger than `rollup_after_days`. Older samples are folded into one
//! `file_metric_daily` row per path per UTC day and deleted. Violations and
//! actions are never pruned.

use std::collections::BTreeMap;

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use steward_core::errors::StorageError;

use crate::sql_err;

#[derive(Debug, Clone)]
pub struct RollupPolicy {
    pub keep_per_path: u32,
    pub rollup_after_days: u32,
}

impl Default for RollupPolicy {
    fn default() -> Self {
        Self {
            keep_per_path: 50,
            rollup_after_days: 7,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RollupReport {
    pub rolled_up: u64,
    pub daily_rows_touched: u64,
    pub duration_ms: u64,
}

/// One day of rolled-up samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRollup {
    pub path: String,
    pub day: i64,
    pub samples: u32,
    pub min_lines: u32,
    pub max_lines: u32,
    pub avg_lines: f64,
    pub max_debt: u32,
}

#[derive(Default)]
struct Accumulator {
    samples: u32,
    min_lines: u32,
    max_lines: u32,
    sum_lines: f64,
    max_debt: u32,
}

impl Accumulator {
    fn add(&mut self, lines: u32, debt: u32) {
        if self.samples == 0 {
            self.min_lines = lines;
            self.max_lines = lines;
        } else {
            self.min_lines = self.min_lines.min(lines);
            self.max_lines = self.max_lines.max(lines);
        }
        self.samples += 1;
        self.sum_lines += f64::from(lines);
        self.max_debt = self.max_debt.max(debt);
    }

    fn merge(&mut self, existing: &DailyRollup) {
        if self.samples == 0 {
            self.min_lines = existing.min_lines;
            self.max_lines = existing.max_lines;
        } else {
            self.min_lines = self.min_lines.min(existing.min_lines);
            self.max_lines = self.max_lines.max(existing.max_lines);
        }
        self.samples += existing.samples;
        self.sum_lines += existing.avg_lines * f64::from(existing.samples);
        self.max_debt = self.max_debt.max(existing.max_debt);
    }
}

/// Apply the rollup inside the caller's transaction.
pub fn apply_rollup(
    conn: &Connection,
    policy: &RollupPolicy,
    now: i64,
) -> Result<RollupReport, StorageError> {
    let start = std::time::Instant::now();
    let cutoff = now - i64::from(policy.rollup_after_days) * 86_400;

    let candidates: Vec<(String, i64, u32, u32)> = {
        let mut stmt = conn
            .prepare_cached(
                "SELECT path, sampled_at, line_count, debt_marker_count FROM (
                    SELECT path, sampled_at, line_count, debt_marker_count,
                           ROW_NUMBER() OVER (PARTITION BY path ORDER BY sampled_at DESC) AS rn
                    FROM file_metrics
                 ) WHERE rn > ?1 AND sampled_at < ?2
                 ORDER BY path ASC, sampled_at ASC",
            )
            .map_err(sql_err)?;
        let rows = stmt
            .query_map(params![policy.keep_per_path, cutoff], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .map_err(sql_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)?
    };

    let mut report = RollupReport::default();
    if candidates.is_empty() {
        return Ok(report);
    }

    let mut days: BTreeMap<(String, i64), Accumulator> = BTreeMap::new();
    for (path, sampled_at, lines, debt) in &candidates {
        days.entry((path.clone(), sampled_at.div_euclid(86_400)))
            .or_default()
            .add(*lines, *debt);
    }

    for ((path, day), mut acc) in days {
        if let Some(existing) = daily_row(conn, &path, day)? {
            acc.merge(&existing);
        }
        conn.execute(
            "INSERT INTO file_metric_daily (path, day, samples, min_lines, max_lines, avg_lines, max_debt)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(path, day) DO UPDATE SET
                samples = excluded.samples, min_lines = excluded.min_lines,
                max_lines = excluded.max_lines, avg_lines = excluded.avg_lines,
                max_debt = excluded.max_debt",
            params![
                path,
                day,
                acc.samples,
                acc.min_lines,
                acc.max_lines,
                acc.sum_lines / f64::from(acc.samples.max(1)),
                acc.max_debt
            ],
        )
        .map_err(sql_err)?;
        report.daily_rows_touched += 1;
    }

    let mut delete = conn
        .prepare_cached("DELETE FROM file_metrics WHERE path = ?1 AND sampled_at = ?2")
        .map_err(sql_err)?;
    for (path, sampled_at, _, _) in &candidates {
        report.rolled_up += delete.execute(params![path, sampled_at]).map_err(sql_err)? as u64;
    }

    report.duration_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        rolled_up = report.rolled_up,
        daily_rows = report.daily_rows_touched,
        "file metric rollup complete"
    );
    Ok(report)
}

fn daily_row(conn: &Connection, path: &str, day: i64) -> Result<Option<DailyRollup>, StorageError> {
    conn.query_row(
        "SELECT path, day, samples, min_lines, max_lines, avg_lines, max_debt
         FROM file_metric_daily WHERE path = ?1 AND day = ?2",
        params![path, day],
        map_daily,
    )
    .optional()
    .map_err(sql_err)
}

fn map_daily(row: &rusqlite::Row<'_>) -> rusqlite::Result<DailyRollup> {
    Ok(DailyRollup {
        path: row.get(0)?,
        day: row.get(1)?,
        samples: row.get(2)?,
        min_lines: row.get(3)?,
        max_lines: row.get(4)?,
        avg_lines: row.get(5)?,
        max_debt: row.get(6)?,
    })
}

/// Daily rollups of `path`, oldest first.
pub fn daily_rollups(conn: &Connection, path: &str) -> Result<Vec<DailyRollup>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT path, day, samples, min_lines, max_lines, avg_lines, max_debt
             FROM file_metric_daily WHERE path = ?1 ORDER BY day ASC",
        )
        .map_err(sql_err)?;
    let rows = stmt.query_map(params![path], map_daily).map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}
