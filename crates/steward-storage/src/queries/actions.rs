//! Plans and actions.

use rusqlite::{params, Connection, OptionalExtension, Row};
use steward_core::errors::StorageError;
use steward_core::types::{Action, ActionKind, ActionPlan, ActionStatus, FileMetric, PlanStatus};

use super::{enum_col, json_col};
use crate::{json_err, sql_err};

const COLUMNS: &str = "id, plan_id, violation_id, kind, subjects, confidence, estimated_duration_s,
    prerequisites, success_criteria, status, created_at, started_at, finished_at, diagnostics";

fn map_row(row: &Row<'_>) -> rusqlite::Result<Action> {
    Ok(Action {
        id: row.get(0)?,
        plan_id: row.get(1)?,
        violation_id: row.get(2)?,
        kind: enum_col(row, 3, ActionKind::parse)?,
        subjects: json_col(row, 4)?,
        confidence: row.get(5)?,
        estimated_duration_s: row.get(6)?,
        prerequisites: json_col(row, 7)?,
        success_criteria: json_col(row, 8)?,
        status: enum_col(row, 9, ActionStatus::parse)?,
        created_at: row.get(10)?,
        started_at: row.get(11)?,
        finished_at: row.get(12)?,
        diagnostics: row.get(13)?,
    })
}

/// Insert an action at position `seq` of its plan.
pub fn insert(conn: &Connection, a: &Action, seq: usize) -> Result<(), StorageError> {
    conn.execute(
        &format!(
            "INSERT INTO actions ({COLUMNS}, seq) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
        ),
        params![
            a.id,
            a.plan_id,
            a.violation_id,
            a.kind.name(),
            serde_json::to_string(&a.subjects).map_err(json_err)?,
            a.confidence,
            a.estimated_duration_s,
            serde_json::to_string(&a.prerequisites).map_err(json_err)?,
            serde_json::to_string(&a.success_criteria).map_err(json_err)?,
            a.status.name(),
            a.created_at,
            a.started_at,
            a.finished_at,
            a.diagnostics,
            seq as i64,
        ],
    )
    .map_err(sql_err)?;
    Ok(())
}

/// Insert an action after the last action of its plan.
pub fn append(conn: &Connection, a: &Action) -> Result<(), StorageError> {
    let next: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(seq) + 1, 0) FROM actions WHERE plan_id = ?1",
            params![a.plan_id],
            |row| row.get(0),
        )
        .map_err(sql_err)?;
    insert(conn, a, next as usize)
}

/// Insert a plan together with its actions.
pub fn insert_plan(conn: &Connection, plan: &ActionPlan) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO plans (id, created_at, overall_confidence, status, rollback_sequence)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            plan.id,
            plan.created_at,
            plan.overall_confidence,
            plan.status.name(),
            serde_json::to_string(&plan.rollback_sequence).map_err(json_err)?,
        ],
    )
    .map_err(sql_err)?;
    for (seq, action) in plan.actions.iter().enumerate() {
        insert(conn, action, seq)?;
    }
    Ok(())
}

pub fn update_plan_status(conn: &Connection, id: &str, status: PlanStatus) -> Result<(), StorageError> {
    let updated = conn
        .execute(
            "UPDATE plans SET status = ?2 WHERE id = ?1",
            params![id, status.name()],
        )
        .map_err(sql_err)?;
    if updated == 0 {
        return Err(StorageError::NotFound {
            entity: "plan",
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn get_plan(conn: &Connection, id: &str) -> Result<Option<ActionPlan>, StorageError> {
    let header = conn
        .query_row(
            "SELECT id, created_at, overall_confidence, status, rollback_sequence FROM plans WHERE id = ?1",
            params![id],
            |row| {
                Ok(ActionPlan {
                    id: row.get(0)?,
                    created_at: row.get(1)?,
                    actions: Vec::new(),
                    overall_confidence: row.get(2)?,
                    status: enum_col(row, 3, PlanStatus::parse)?,
                    rollback_sequence: json_col(row, 4)?,
                })
            },
        )
        .optional()
        .map_err(sql_err)?;
    let Some(mut plan) = header else {
        return Ok(None);
    };
    let mut stmt = conn
        .prepare_cached(&format!("SELECT {COLUMNS} FROM actions WHERE plan_id = ?1 ORDER BY seq ASC"))
        .map_err(sql_err)?;
    let rows = stmt.query_map(params![id], map_row).map_err(sql_err)?;
    plan.actions = rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)?;
    Ok(Some(plan))
}

pub fn get(conn: &Connection, id: &str) -> Result<Option<Action>, StorageError> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM actions WHERE id = ?1"),
        params![id],
        map_row,
    )
    .optional()
    .map_err(sql_err)
}

/// Move an action to `status`, enforcing the lifecycle. Running stamps
/// `started_at`; Completed and Failed stamp `finished_at`.
pub fn update_status(
    conn: &Connection,
    id: &str,
    status: ActionStatus,
    at: i64,
    post_metrics: Option<&[FileMetric]>,
    diagnostics: Option<&str>,
) -> Result<(), StorageError> {
    let current = get(conn, id)?.ok_or_else(|| StorageError::NotFound {
        entity: "action",
        id: id.to_string(),
    })?;
    if !current.status.can_transition_to(status) {
        return Err(StorageError::InvalidTransition {
            id: id.to_string(),
            from: current.status.name().to_string(),
            to: status.name().to_string(),
        });
    }
    let post = post_metrics
        .map(serde_json::to_string)
        .transpose()
        .map_err(json_err)?;
    let (started_at, finished_at) = match status {
        ActionStatus::Running => (Some(at), current.finished_at),
        ActionStatus::Completed | ActionStatus::Failed => (current.started_at, Some(at)),
        _ => (current.started_at, current.finished_at),
    };
    conn.execute(
        "UPDATE actions SET status = ?2, started_at = ?3, finished_at = ?4,
            diagnostics = COALESCE(?5, diagnostics), post_metrics = COALESCE(?6, post_metrics)
         WHERE id = ?1",
        params![id, status.name(), started_at, finished_at, diagnostics, post],
    )
    .map_err(sql_err)?;
    Ok(())
}

pub fn with_status(conn: &Connection, status: ActionStatus) -> Result<Vec<Action>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {COLUMNS} FROM actions WHERE status = ?1 ORDER BY created_at ASC, seq ASC"
        ))
        .map_err(sql_err)?;
    let rows = stmt.query_map(params![status.name()], map_row).map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

/// Actions that finished at or after `since`.
pub fn finished_since(conn: &Connection, since: i64) -> Result<Vec<Action>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {COLUMNS} FROM actions WHERE finished_at IS NOT NULL AND finished_at >= ?1
             ORDER BY finished_at ASC"
        ))
        .map_err(sql_err)?;
    let rows = stmt.query_map(params![since], map_row).map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}

/// Post-metrics recorded for a completed action.
pub fn post_metrics(conn: &Connection, id: &str) -> Result<Option<Vec<FileMetric>>, StorageError> {
    let raw: Option<Option<String>> = conn
        .query_row(
            "SELECT post_metrics FROM actions WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()
        .map_err(sql_err)?;
    match raw.flatten() {
        Some(s) => serde_json::from_str(&s).map(Some).map_err(json_err),
        None => Ok(None),
    }
}
