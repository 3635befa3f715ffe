//! BEGIN IMMEDIATE transactions for the writer connection.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use steward_core::errors::StorageError;

use crate::sql_err;

/// Run `f` inside a `BEGIN IMMEDIATE` transaction. The write lock is taken at
/// transaction start; any error rolls everything back when `tx` drops.
pub fn with_immediate_transaction<F, T>(conn: &Connection, f: F) -> Result<T, StorageError>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, StorageError>,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate).map_err(sql_err)?;
    let result = f(&tx)?;
    tx.commit().map_err(sql_err)?;
    Ok(result)
}
