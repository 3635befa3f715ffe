//! Append-only event log.

use rusqlite::{params, Connection};
use steward_core::errors::StorageError;

use crate::sql_err;

#[derive(Debug, Clone)]
pub struct EventRow {
    pub id: i64,
    pub at: i64,
    pub name: String,
    pub payload: String,
}

pub fn insert(conn: &Connection, at: i64, name: &str, payload: &str) -> Result<i64, StorageError> {
    conn.execute(
        "INSERT INTO event_log (at, name, payload) VALUES (?1, ?2, ?3)",
        params![at, name, payload],
    )
    .map_err(sql_err)?;
    Ok(conn.last_insert_rowid())
}

pub fn since(conn: &Connection, since: i64) -> Result<Vec<EventRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached("SELECT id, at, name, payload FROM event_log WHERE at >= ?1 ORDER BY id ASC")
        .map_err(sql_err)?;
    let rows = stmt
        .query_map(params![since], |row| {
            Ok(EventRow {
                id: row.get(0)?,
                at: row.get(1)?,
                name: row.get(2)?,
                payload: row.get(3)?,
            })
        })
        .map_err(sql_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)
}
