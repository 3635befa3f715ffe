//! Scanner output types.

use serde::Serialize;
use steward_core::types::FileMetric;

/// A measured file together with its normalized content.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub metric: FileMetric,
    pub content: String,
}

/// A file the scanner could not measure this cycle.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub error_code: &'static str,
    pub reason: String,
}

/// Navigation profile of the root navigation document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RootDocumentProfile {
    pub path: String,
    pub header_count: u32,
    pub link_count: u32,
    pub max_header_depth: u8,
    pub quick_nav_present: bool,
}

/// Result of one scan cycle.
#[derive(Debug, Clone, Default)]
pub struct ScanSnapshot {
    pub sampled_at: i64,
    /// Sorted by path.
    pub files: Vec<ScannedFile>,
    pub skipped: Vec<SkippedFile>,
    pub duration_ms: u64,
    /// `None` when the root navigation document is missing.
    pub root_document: Option<RootDocumentProfile>,
}

impl ScanSnapshot {
    pub fn metrics(&self) -> Vec<FileMetric> {
        self.files.iter().map(|f| f.metric.clone()).collect()
    }

    pub fn file(&self, path: &str) -> Option<&ScannedFile> {
        self.files
            .binary_search_by(|f| f.metric.path.as_str().cmp(path))
            .ok()
            .map(|i| &self.files[i])
    }

    pub fn skipped_count(&self) -> u32 {
        self.skipped.len() as u32
    }

    pub fn total_lines(&self) -> u64 {
        self.files.iter().map(|f| u64::from(f.metric.line_count)).sum()
    }

    /// `(path, content)` of every non-empty file, in path order.
    pub fn documents(&self) -> Vec<(&str, &str)> {
        self.files
            .iter()
            .filter(|f| !f.metric.is_empty())
            .map(|f| (f.metric.path.as_str(), f.content.as_str()))
            .collect()
    }
}
