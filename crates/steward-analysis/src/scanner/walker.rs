//! Corpus discovery using the `ignore` crate.
//!
//! Hidden entries are skipped, `.gitignore` and `.stewardignore` are honored
//! (even outside a git repository), and only allowed extensions survive.
//! Results are sorted and deduplicated so overlapping roots and walk order
//! never change a snapshot.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use steward_core::constants::IGNORE_FILE_NAME;
use steward_core::errors::ScanError;
use steward_core::types::collections::FxHashSet;
use steward_core::AllowedRoots;

/// A discovered corpus file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DiscoveredFile {
    /// Relative to the working root, `/`-separated.
    pub rel: String,
    pub abs: PathBuf,
}

/// Walk settings derived from `ScanConfig`.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub extensions: Vec<String>,
    pub exclude: Vec<glob::Pattern>,
    pub follow_symlinks: bool,
}

impl WalkOptions {
    /// Compile exclude globs; invalid patterns are reported and dropped.
    pub fn new(extensions: Vec<String>, exclude: &[String], follow_symlinks: bool) -> Self {
        let exclude = exclude
            .iter()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!(pattern = %p, error = %e, "ignoring invalid exclude glob");
                    None
                }
            })
            .collect();
        Self {
            extensions,
            exclude,
            follow_symlinks,
        }
    }

    fn extension_allowed(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
    }

    fn excluded(&self, rel: &str) -> bool {
        self.exclude.iter().any(|p| p.matches(rel))
    }
}

/// Walk every allowed root and return the matching files, sorted by path.
pub fn discover(roots: &AllowedRoots, options: &WalkOptions) -> Result<Vec<DiscoveredFile>, ScanError> {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut files = Vec::new();

    for root in roots.roots() {
        let walker = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .require_git(false)
            .add_custom_ignore_filename(IGNORE_FILE_NAME)
            .follow_links(options.follow_symlinks)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "walk error, continuing");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let abs = entry.path();
            if !options.extension_allowed(abs) {
                continue;
            }
            // Symlinked files may point outside the roots.
            if options.follow_symlinks {
                match abs.canonicalize() {
                    Ok(real) if roots.contains(&real) => {}
                    _ => continue,
                }
            }
            let Some(rel) = roots.relativize(abs) else {
                continue;
            };
            if options.excluded(&rel) || !seen.insert(rel.clone()) {
                continue;
            }
            files.push(DiscoveredFile {
                rel,
                abs: abs.to_path_buf(),
            });
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> (tempfile::TempDir, AllowedRoots) {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir_all(docs.join("drafts")).unwrap();
        std::fs::create_dir_all(docs.join(".hidden")).unwrap();
        std::fs::write(docs.join("b.md"), "# B\n").unwrap();
        std::fs::write(docs.join("a.MD"), "# A\n").unwrap();
        std::fs::write(docs.join("notes.txt"), "x").unwrap();
        std::fs::write(docs.join("drafts/wip.md"), "# W\n").unwrap();
        std::fs::write(docs.join(".hidden/h.md"), "# H\n").unwrap();
        std::fs::write(docs.join("ignored.md"), "# I\n").unwrap();
        std::fs::write(docs.join(IGNORE_FILE_NAME), "ignored.md\n").unwrap();
        let roots = AllowedRoots::new(dir.path(), &["docs".to_string()]).unwrap();
        (dir, roots)
    }

    #[test]
    fn discovers_markdown_sorted() {
        let (_dir, roots) = corpus();
        let options = WalkOptions::new(vec!["md".into()], &[], false);
        let files: Vec<String> = discover(&roots, &options).unwrap().into_iter().map(|f| f.rel).collect();
        assert_eq!(files, vec!["docs/a.MD", "docs/b.md", "docs/drafts/wip.md"]);
    }

    #[test]
    fn exclude_globs_apply_to_relative_paths() {
        let (_dir, roots) = corpus();
        let options = WalkOptions::new(vec!["md".into()], &["docs/drafts/**".to_string()], false);
        let files = discover(&roots, &options).unwrap();
        assert!(files.iter().all(|f| !f.rel.contains("drafts")));
    }
}
