//! Action backups.
//!
//! Layout under `<results>/backups/<action_id>/`:
//! - `manifest.json`: every subject with its hash, length, and permissions
//! - `NNN.bak`: byte copy of subject `NNN`
//! - `created.json`: files the transform created, appended before each write
//!
//! A backup is complete before its action enters Running, and it is only
//! removed by `BackupStore::prune`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use steward_core::constants::SECONDS_PER_DAY;
use steward_core::errors::{GovernanceError, RemediationError};
use steward_core::types::{ActionStatus, BackupRecord};
use steward_core::AllowedRoots;
use steward_storage::MetricStore;
use xxhash_rust::xxh3::xxh3_64;

use crate::fsutil::{io_err, write_atomic};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const CREATED_FILE: &str = "created.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Corpus-relative path.
    pub path: String,
    /// False when the subject did not exist at snapshot time.
    pub existed: bool,
    /// Copy file name inside the backup directory.
    pub copy: Option<String>,
    pub len: u64,
    pub hash: u64,
    pub readonly: bool,
    /// Unix mode bits, where available.
    pub mode: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupManifest {
    pub action_id: String,
    pub created_at: i64,
    pub entries: Vec<ManifestEntry>,
}

/// Append-only list of files a transform created, persisted on every append
/// so rollback after a crash still knows what to delete.
#[derive(Debug)]
pub struct CreatedLog {
    path: PathBuf,
    files: Mutex<Vec<String>>,
}

impl CreatedLog {
    fn open(path: PathBuf) -> Result<Self, RemediationError> {
        let files = if path.exists() {
            let bytes = fs::read(&path).map_err(|e| io_err(&path, e))?;
            serde_json::from_slice(&bytes).map_err(|e| RemediationError::Corrupt {
                path: path.clone(),
                message: e.to_string(),
            })?
        } else {
            Vec::new()
        };
        Ok(Self {
            path,
            files: Mutex::new(files),
        })
    }

    /// Record `rel` before the file is written.
    pub fn record(&self, rel: &str) -> Result<(), RemediationError> {
        let mut files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        if !files.iter().any(|f| f == rel) {
            files.push(rel.to_string());
        }
        let json = serde_json::to_vec(&*files).map_err(|e| io_err(&self.path, e))?;
        write_atomic(&self.path, &json)
    }

    pub fn files(&self) -> Vec<String> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// A loaded backup.
#[derive(Debug)]
pub struct Snapshot {
    pub dir: PathBuf,
    pub manifest: BackupManifest,
    pub created: CreatedLog,
}

impl Snapshot {
    pub fn entry(&self, rel: &str) -> Option<&ManifestEntry> {
        self.manifest.entries.iter().find(|e| e.path == rel)
    }

    /// Pre-action content of `rel`, if it existed.
    pub fn original_text(&self, rel: &str) -> Option<String> {
        let copy = self.entry(rel)?.copy.as_ref()?;
        let bytes = fs::read(self.dir.join(copy)).ok()?;
        String::from_utf8(bytes).ok()
    }

    /// Store-side registry record.
    pub fn record(&self) -> BackupRecord {
        BackupRecord {
            action_id: self.manifest.action_id.clone(),
            created_at: self.manifest.created_at,
            location: self.dir.to_string_lossy().into_owned(),
            file_count: self.manifest.entries.iter().filter(|e| e.existed).count() as u32,
            total_bytes: self.manifest.entries.iter().map(|e| e.len).sum(),
            pruned_at: None,
        }
    }
}

/// Outcome of a restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    pub removed: usize,
}

/// Owner of `<results>/backups`.
#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
}

impl BackupStore {
    pub fn new(results_root: &Path) -> Self {
        Self {
            root: results_root.join("backups"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, action_id: &str) -> PathBuf {
        self.root.join(action_id)
    }

    /// Copy every subject into a fresh backup directory.
    pub fn snapshot(
        &self,
        action_id: &str,
        subjects: &[(String, PathBuf)],
        now: i64,
    ) -> Result<Snapshot, RemediationError> {
        let backup_err = |message: String| RemediationError::Backup {
            action_id: action_id.to_string(),
            message,
        };
        let dir = self.dir(action_id);
        if dir.exists() {
            return Err(backup_err(format!("{} already exists", dir.display())));
        }
        fs::create_dir_all(&dir).map_err(|e| backup_err(e.to_string()))?;

        let mut entries = Vec::with_capacity(subjects.len());
        for (i, (rel, abs)) in subjects.iter().enumerate() {
            let entry = match fs::read(abs) {
                Ok(bytes) => {
                    let meta = fs::metadata(abs).map_err(|e| backup_err(e.to_string()))?;
                    let copy = format!("{i:03}.bak");
                    fs::write(dir.join(&copy), &bytes).map_err(|e| backup_err(e.to_string()))?;
                    ManifestEntry {
                        path: rel.clone(),
                        existed: true,
                        copy: Some(copy),
                        len: bytes.len() as u64,
                        hash: xxh3_64(&bytes),
                        readonly: meta.permissions().readonly(),
                        mode: mode_of(&meta),
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => ManifestEntry {
                    path: rel.clone(),
                    existed: false,
                    copy: None,
                    len: 0,
                    hash: 0,
                    readonly: false,
                    mode: None,
                },
                Err(e) => return Err(backup_err(format!("{}: {e}", abs.display()))),
            };
            entries.push(entry);
        }

        let manifest = BackupManifest {
            action_id: action_id.to_string(),
            created_at: now,
            entries,
        };
        let json = serde_json::to_vec_pretty(&manifest).map_err(|e| backup_err(e.to_string()))?;
        write_atomic(&dir.join(MANIFEST_FILE), &json)?;
        let created = CreatedLog::open(dir.join(CREATED_FILE))?;
        tracing::debug!(action_id, files = manifest.entries.len(), "backup written");
        Ok(Snapshot {
            dir,
            manifest,
            created,
        })
    }

    pub fn load(&self, action_id: &str) -> Result<Snapshot, RemediationError> {
        let dir = self.dir(action_id);
        let manifest_path = dir.join(MANIFEST_FILE);
        let bytes = fs::read(&manifest_path).map_err(|e| RemediationError::Backup {
            action_id: action_id.to_string(),
            message: format!("{}: {e}", manifest_path.display()),
        })?;
        let manifest: BackupManifest =
            serde_json::from_slice(&bytes).map_err(|e| RemediationError::Corrupt {
                path: manifest_path.clone(),
                message: e.to_string(),
            })?;
        let created = CreatedLog::open(dir.join(CREATED_FILE))?;
        Ok(Snapshot {
            dir,
            manifest,
            created,
        })
    }

    /// Put every subject back to its snapshot bytes and permissions, and
    /// delete the files the transform created. Safe to repeat.
    pub fn restore(&self, snapshot: &Snapshot, roots: &AllowedRoots) -> Result<RestoreReport, RemediationError> {
        let mut report = RestoreReport::default();
        for entry in &snapshot.manifest.entries {
            let abs = roots.resolve(&entry.path)?;
            match &entry.copy {
                Some(copy) if entry.existed => {
                    let copy_path = snapshot.dir.join(copy);
                    let bytes = fs::read(&copy_path).map_err(|e| io_err(&copy_path, e))?;
                    if xxh3_64(&bytes) != entry.hash {
                        return Err(RemediationError::Corrupt {
                            path: copy_path,
                            message: "backup copy hash mismatch".to_string(),
                        });
                    }
                    write_atomic(&abs, &bytes)?;
                    set_permissions(&abs, entry).map_err(|e| io_err(&abs, e))?;
                    report.restored += 1;
                }
                _ => {
                    if abs.exists() {
                        fs::remove_file(&abs).map_err(|e| io_err(&abs, e))?;
                        report.removed += 1;
                    }
                }
            }
        }
        for rel in snapshot.created.files().iter().rev() {
            if snapshot.entry(rel).is_some_and(|e| e.existed) {
                continue;
            }
            let abs = roots.resolve(rel)?;
            if abs.exists() {
                fs::remove_file(&abs).map_err(|e| io_err(&abs, e))?;
                report.removed += 1;
            }
        }
        tracing::info!(
            action_id = %snapshot.manifest.action_id,
            restored = report.restored,
            removed = report.removed,
            "backup restored"
        );
        Ok(report)
    }

    /// Delete backups older than `retention_days` whose action has finished.
    /// Returns the number pruned.
    pub fn prune(&self, store: &MetricStore, retention_days: u32, now: i64) -> Result<usize, GovernanceError> {
        let before = now - (f64::from(retention_days) * SECONDS_PER_DAY) as i64;
        let mut pruned = 0;
        for record in store.backups_created_before(before)? {
            let in_flight = store
                .action(&record.action_id)?
                .is_some_and(|a| matches!(a.status, ActionStatus::Pending | ActionStatus::Running));
            if in_flight {
                continue;
            }
            let dir = PathBuf::from(&record.location);
            if dir.starts_with(&self.root) && dir.exists() {
                fs::remove_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
            }
            store.mark_backup_pruned(&record.action_id, now)?;
            pruned += 1;
        }
        if pruned > 0 {
            tracing::info!(pruned, retention_days, "backups pruned");
        }
        Ok(pruned)
    }
}

#[cfg(unix)]
fn mode_of(meta: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(meta.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn mode_of(_meta: &fs::Metadata) -> Option<u32> {
    None
}

fn set_permissions(path: &Path, entry: &ManifestEntry) -> std::io::Result<()> {
    #[cfg(unix)]
    if let Some(mode) = entry.mode {
        use std::os::unix::fs::PermissionsExt;
        return fs::set_permissions(path, fs::Permissions::from_mode(mode));
    }
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(entry.readonly);
    fs::set_permissions(path, perms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> (tempfile::TempDir, AllowedRoots, BackupStore) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/a.md"), "# A\nbody\n").unwrap();
        let roots = AllowedRoots::new(dir.path(), &["docs".to_string()]).unwrap();
        let store = BackupStore::new(&dir.path().join(".steward-results"));
        (dir, roots, store)
    }

    #[test]
    fn restore_puts_bytes_back_and_removes_created_files() {
        let (dir, roots, backups) = corpus();
        let a = roots.resolve("docs/a.md").unwrap();
        let subjects = vec![("docs/a.md".to_string(), a.clone())];
        let snap = backups.snapshot("act-1", &subjects, 10).unwrap();
        assert_eq!(snap.record().file_count, 1);

        fs::write(&a, "rewritten\n").unwrap();
        snap.created.record("docs/new.md").unwrap();
        fs::write(dir.path().join("docs/new.md"), "x").unwrap();

        // Reload from disk, as startup recovery does.
        let loaded = backups.load("act-1").unwrap();
        let report = backups.restore(&loaded, &roots).unwrap();
        assert_eq!(report, RestoreReport { restored: 1, removed: 1 });
        assert_eq!(fs::read_to_string(&a).unwrap(), "# A\nbody\n");
        assert!(!dir.path().join("docs/new.md").exists());

        // Idempotent.
        assert_eq!(backups.restore(&loaded, &roots).unwrap().removed, 0);
    }

    #[test]
    fn snapshot_refuses_to_overwrite() {
        let (_dir, roots, backups) = corpus();
        let subjects = vec![("docs/a.md".to_string(), roots.resolve("docs/a.md").unwrap())];
        backups.snapshot("act-2", &subjects, 10).unwrap();
        assert!(matches!(
            backups.snapshot("act-2", &subjects, 11),
            Err(RemediationError::Backup { .. })
        ));
    }

    #[test]
    fn tampered_copy_is_corrupt() {
        let (_dir, roots, backups) = corpus();
        let subjects = vec![("docs/a.md".to_string(), roots.resolve("docs/a.md").unwrap())];
        let snap = backups.snapshot("act-3", &subjects, 10).unwrap();
        fs::write(snap.dir.join("000.bak"), "tampered").unwrap();
        assert!(matches!(
            backups.restore(&snap, &roots),
            Err(RemediationError::Corrupt { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn restore_brings_back_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let (_dir, roots, backups) = corpus();
        let a = roots.resolve("docs/a.md").unwrap();
        fs::set_permissions(&a, fs::Permissions::from_mode(0o640)).unwrap();
        let snap = backups
            .snapshot("act-4", &[("docs/a.md".to_string(), a.clone())], 10)
            .unwrap();
        fs::set_permissions(&a, fs::Permissions::from_mode(0o600)).unwrap();
        backups.restore(&snap, &roots).unwrap();
        assert_eq!(fs::metadata(&a).unwrap().permissions().mode() & 0o777, 0o640);
    }
}
