//! Read-only connections for history, dashboard and report queries.
//!
//! A long report query must not stall the detector's history read, so a
//! checkout takes the first idle connection, starting after the last one
//! handed out, and only waits when every connection is busy.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use rusqlite::{Connection, OpenFlags};
use steward_core::errors::StorageError;

use super::pragmas::apply_read_pragmas;
use crate::sql_err;

const MAX_POOL_SIZE: usize = 8;

pub struct ReadPool {
    connections: Vec<Mutex<Connection>>,
    next: AtomicUsize,
}

impl ReadPool {
    /// Open `pool_size` (1..=8) query-only connections to an existing WAL database.
    pub fn open(path: &Path, pool_size: usize) -> Result<Self, StorageError> {
        let size = pool_size.clamp(1, MAX_POOL_SIZE);
        let mut connections = Vec::with_capacity(size);
        for _ in 0..size {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(sql_err)?;
            apply_read_pragmas(&conn)?;
            connections.push(Mutex::new(conn));
        }
        Ok(Self {
            connections,
            next: AtomicUsize::new(0),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let guard = self.checkout();
        f(&guard)
    }

    fn checkout(&self) -> MutexGuard<'_, Connection> {
        let len = self.connections.len();
        let start = self.next.fetch_add(1, Ordering::Relaxed) % len;
        for offset in 0..len {
            match self.connections[(start + offset) % len].try_lock() {
                Ok(guard) => return guard,
                // Queries are read-only; a panicked reader leaves nothing half-written.
                Err(TryLockError::Poisoned(poisoned)) => return poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => {}
            }
        }
        tracing::trace!(readers = len, "all readers busy, waiting");
        self.connections[start]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn size(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::pragmas::apply_pragmas;

    /// A WAL database with one row, and its open writer.
    fn database(dir: &tempfile::TempDir) -> (std::path::PathBuf, Connection) {
        let path = dir.path().join("steward.db");
        let writer = Connection::open(&path).unwrap();
        apply_pragmas(&writer).unwrap();
        writer
            .execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (7);")
            .unwrap();
        (path, writer)
    }

    fn read_x(conn: &Connection) -> Result<i64, StorageError> {
        conn.query_row("SELECT x FROM t", [], |row| row.get(0)).map_err(sql_err)
    }

    #[test]
    fn busy_reader_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _writer) = database(&dir);
        let pool = ReadPool::open(&path, 2).unwrap();
        // The outer checkout holds reader 0. The second inner checkout starts
        // at reader 0 again and must move on instead of waiting for it.
        let total = pool
            .with_conn(|held| Ok(read_x(held)? + pool.with_conn(read_x)? + pool.with_conn(read_x)?))
            .unwrap();
        assert_eq!(total, 21);
    }

    #[test]
    fn readers_are_query_only_and_sized_within_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _writer) = database(&dir);
        assert_eq!(ReadPool::open(&path, 0).unwrap().size(), 1);
        let pool = ReadPool::open(&path, 64).unwrap();
        assert_eq!(pool.size(), MAX_POOL_SIZE);
        let write = pool.with_conn(|conn| conn.execute("INSERT INTO t VALUES (1)", []).map_err(sql_err));
        assert!(write.is_err());
    }
}
