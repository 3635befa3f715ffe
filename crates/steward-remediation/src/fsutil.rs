//! Small filesystem helpers shared by transforms and backups.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use steward_core::errors::RemediationError;

pub(crate) fn io_err(path: &Path, e: impl std::fmt::Display) -> RemediationError {
    RemediationError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.steward.tmp"))
}

/// Write `bytes` to a hidden sibling and rename it over `path`, so readers see
/// either the old or the new content. Existing permissions are carried over.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RemediationError> {
    let tmp = temp_path(path);
    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        if let Ok(meta) = fs::metadata(path) {
            fs::set_permissions(&tmp, meta.permissions())?;
        }
        fs::rename(&tmp, path)
    })();
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// Read a corpus file as UTF-8.
pub(crate) fn read_text(path: &Path) -> Result<String, RemediationError> {
    let bytes = fs::read(path).map_err(|e| io_err(path, e))?;
    String::from_utf8(bytes).map_err(|_| RemediationError::Corrupt {
        path: path.to_path_buf(),
        message: "not valid UTF-8".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_replaces_content_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.md");
        fs::write(&path, "old\n").unwrap();
        write_atomic(&path, b"new\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
        let names: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(names.len(), 1);
    }
}
