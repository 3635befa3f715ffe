//! Filesystem boundary: every corpus path must resolve under an allowed root.

use std::path::{Component, Path, PathBuf};

use crate::errors::{ConfigError, RemediationError, ScanError};

/// Canonical allow-listed roots plus the base that relative corpus paths
/// (e.g. `docs/guide.md`) are expressed against.
#[derive(Debug, Clone)]
pub struct AllowedRoots {
    base: PathBuf,
    roots: Vec<PathBuf>,
}

impl AllowedRoots {
    /// `roots` are resolved against `base`; each must exist.
    pub fn new(base: &Path, roots: &[String]) -> Result<Self, ScanError> {
        let base = base.canonicalize().map_err(|_| ScanError::RootNotFound {
            path: base.to_path_buf(),
        })?;
        let mut resolved = Vec::with_capacity(roots.len());
        for root in roots {
            let candidate = base.join(root);
            let canonical = candidate
                .canonicalize()
                .map_err(|_| ScanError::RootNotFound { path: candidate.clone() })?;
            if !canonical.is_dir() {
                return Err(ScanError::RootNotFound { path: candidate });
            }
            resolved.push(canonical);
        }
        Ok(Self {
            base,
            roots: resolved,
        })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// True when `abs` is lexically under one of the roots.
    pub fn contains(&self, abs: &Path) -> bool {
        self.roots.iter().any(|r| abs.starts_with(r))
    }

    /// Resolve a relative corpus path to an absolute one, rejecting anything
    /// that escapes the roots lexically or through symlinks.
    pub fn resolve(&self, rel: &str) -> Result<PathBuf, RemediationError> {
        let outside = || RemediationError::OutsideRoots {
            path: PathBuf::from(rel),
        };
        let joined = normalize(&self.base.join(rel)).ok_or_else(outside)?;
        if !self.contains(&joined) {
            return Err(outside());
        }
        // Symlinks: check the real location of the file, or of its parent when
        // the file does not exist yet.
        let real = if joined.exists() {
            joined.canonicalize().ok()
        } else {
            joined
                .parent()
                .and_then(|p| p.canonicalize().ok())
                .zip(joined.file_name())
                .map(|(p, name)| p.join(name))
        };
        match real {
            Some(r) if self.contains(&r) => Ok(joined),
            _ => Err(outside()),
        }
    }

    /// Express an absolute path relative to the base, `/`-separated.
    pub fn relativize(&self, abs: &Path) -> Option<String> {
        let rel = abs.strip_prefix(&self.base).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    /// Reject a results root placed inside the corpus.
    pub fn ensure_outside(&self, results_root: &Path) -> Result<(), ConfigError> {
        let abs = if results_root.is_absolute() {
            results_root.to_path_buf()
        } else {
            self.base.join(results_root)
        };
        let abs = normalize(&abs).unwrap_or(abs);
        if self.roots.iter().any(|r| abs.starts_with(r)) {
            return Err(ConfigError::ValidationFailed {
                field: "orchestrator.results_root".to_string(),
                message: format!("{} is inside a corpus root", abs.display()),
            });
        }
        Ok(())
    }
}

/// Lexically resolve `.` and `..`. `None` when `..` climbs past the root.
pub fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, AllowedRoots) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs/sub")).unwrap();
        std::fs::write(dir.path().join("docs/a.md"), "# A\n").unwrap();
        std::fs::write(dir.path().join("secret.md"), "x").unwrap();
        let roots = AllowedRoots::new(dir.path(), &["docs".to_string()]).unwrap();
        (dir, roots)
    }

    #[test]
    fn resolves_paths_under_roots() {
        let (_dir, roots) = setup();
        let p = roots.resolve("docs/a.md").unwrap();
        assert!(p.ends_with("docs/a.md"));
        // Files that do not exist yet are fine when their parent is inside.
        assert!(roots.resolve("docs/sub/new.md").is_ok());
        assert_eq!(roots.relativize(&p).as_deref(), Some("docs/a.md"));
    }

    #[test]
    fn rejects_escapes() {
        let (_dir, roots) = setup();
        assert!(roots.resolve("secret.md").is_err());
        assert!(roots.resolve("docs/../secret.md").is_err());
        assert!(roots.resolve("../../etc/passwd").is_err());
        assert!(roots.resolve("/etc/passwd").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn rejects_symlink_escape() {
        let (dir, roots) = setup();
        std::os::unix::fs::symlink(dir.path().join("secret.md"), dir.path().join("docs/link.md"))
            .unwrap();
        assert!(roots.resolve("docs/link.md").is_err());
    }

    #[test]
    fn results_root_must_be_outside_corpus() {
        let (_dir, roots) = setup();
        assert!(roots.ensure_outside(Path::new(".steward-results")).is_ok());
        assert!(roots.ensure_outside(Path::new("docs/.results")).is_err());
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AllowedRoots::new(dir.path(), &["nope".to_string()]).is_err());
    }
}
