//! Corpus scanning configuration.

use serde::{Deserialize, Serialize};

use super::merge_options;
use crate::constants::DEFAULT_ROOT_DOCUMENT;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScanConfig {
    /// Allow-listed corpus roots, relative to the working root. Default: `["docs"]`.
    pub roots: Vec<String>,
    /// File extensions to scan, without the dot. Default: `["md"]`.
    pub extensions: Vec<String>,
    /// Glob patterns excluded from the scan, matched on relative paths.
    pub exclude: Vec<String>,
    /// Root navigation document, relative to the first root. Default: `README.md`.
    pub root_document: Option<String>,
    /// Per-file read timeout in milliseconds. Default: 2000.
    pub file_timeout_ms: Option<u64>,
    /// Files larger than this many bytes are skipped. Default: 10 MiB.
    pub max_file_size: Option<u64>,
    /// Follow symbolic links. Default: false.
    pub follow_symlinks: Option<bool>,
}

impl ScanConfig {
    pub fn effective_roots(&self) -> Vec<String> {
        if self.roots.is_empty() {
            vec!["docs".to_string()]
        } else {
            self.roots.clone()
        }
    }

    pub fn effective_extensions(&self) -> Vec<String> {
        if self.extensions.is_empty() {
            vec!["md".to_string()]
        } else {
            self.extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect()
        }
    }

    pub fn effective_root_document(&self) -> String {
        self.root_document
            .clone()
            .unwrap_or_else(|| DEFAULT_ROOT_DOCUMENT.to_string())
    }

    pub fn effective_file_timeout_ms(&self) -> u64 {
        self.file_timeout_ms.unwrap_or(2_000)
    }

    pub fn effective_max_file_size(&self) -> u64 {
        self.max_file_size.unwrap_or(10 * 1024 * 1024)
    }

    pub fn effective_follow_symlinks(&self) -> bool {
        self.follow_symlinks.unwrap_or(false)
    }

    pub(crate) fn merge(&mut self, other: &ScanConfig) {
        if !other.roots.is_empty() {
            self.roots = other.roots.clone();
        }
        if !other.extensions.is_empty() {
            self.extensions = other.extensions.clone();
        }
        if !other.exclude.is_empty() {
            self.exclude = other.exclude.clone();
        }
        merge_options!(self, other; root_document, file_timeout_ms, max_file_size, follow_symlinks);
    }
}
