//! Per-subject advisory locks via fd-lock.
//!
//! One lock file per corpus path under `<results>/locks/`, named by the xxh3
//! of the path. Locks are taken non-blocking in sorted path order and held
//! for the whole lock/snapshot/transform/validate sequence.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fd_lock::{RwLock, RwLockWriteGuard};
use steward_core::errors::RemediationError;
use steward_core::traits::RetryPolicy;
use xxhash_rust::xxh3::xxh3_64;

use crate::fsutil::io_err;

#[derive(Debug, Clone)]
pub struct SubjectLocks {
    dir: PathBuf,
}

impl SubjectLocks {
    pub fn new(results_root: &Path) -> Self {
        Self {
            dir: results_root.join("locks"),
        }
    }

    /// Lock file guarding corpus path `rel`.
    pub fn lock_path(&self, rel: &str) -> PathBuf {
        self.dir.join(format!("{:016x}.lock", xxh3_64(rel.as_bytes())))
    }

    /// Run `f` while holding write locks on every subject.
    ///
    /// A busy lock is retried `attempts` times in total, sleeping
    /// `policy.delay(n)` in between; after that `LockBusy` is returned and `f`
    /// never runs.
    pub fn with_locks<T>(
        &self,
        subjects: &[String],
        policy: &RetryPolicy,
        attempts: u32,
        f: impl FnOnce() -> T,
    ) -> Result<T, RemediationError> {
        let mut files = self.open(subjects)?;
        let mut f = Some(f);
        let attempts = attempts.max(1);
        for attempt in 0..attempts {
            match try_write_all(&mut files) {
                Ok(_guards) => {
                    if let Some(f) = f.take() {
                        return Ok(f());
                    }
                }
                Err(RemediationError::LockBusy { path }) => {
                    tracing::debug!(path = %path.display(), attempt, "subject lock busy");
                    if attempt + 1 == attempts {
                        return Err(RemediationError::LockBusy { path });
                    }
                    std::thread::sleep(policy.delay(attempt));
                }
                Err(e) => return Err(e),
            }
        }
        Err(RemediationError::LockBusy {
            path: self.dir.clone(),
        })
    }

    fn open(&self, subjects: &[String]) -> Result<Vec<(PathBuf, RwLock<File>)>, RemediationError> {
        fs::create_dir_all(&self.dir).map_err(|e| io_err(&self.dir, e))?;
        let mut paths: Vec<&String> = subjects.iter().collect();
        paths.sort();
        paths.dedup();
        paths
            .into_iter()
            .map(|rel| {
                let path = self.lock_path(rel);
                let file = OpenOptions::new()
                    .create(true)
                    .truncate(false)
                    .write(true)
                    .open(&path)
                    .map_err(|e| io_err(&path, e))?;
                Ok((path, RwLock::new(file)))
            })
            .collect()
    }
}

fn try_write_all(
    locks: &mut [(PathBuf, RwLock<File>)],
) -> Result<Vec<RwLockWriteGuard<'_, File>>, RemediationError> {
    let mut guards = Vec::with_capacity(locks.len());
    for (path, lock) in locks.iter_mut() {
        match lock.try_write() {
            Ok(guard) => guards.push(guard),
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                return Err(RemediationError::LockBusy { path: path.clone() });
            }
            Err(e) => {
                return Err(RemediationError::Lock {
                    path: path.clone(),
                    message: e.to_string(),
                });
            }
        }
    }
    Ok(guards)
}
