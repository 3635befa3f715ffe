//! Per-file and system-wide structural metrics.

use serde::{Deserialize, Serialize};

/// One structural sample of a corpus file.
///
/// All counts are derived from the normalized text (trailing whitespace
/// stripped per line), so two samples with the same `content_hash` carry
/// the same counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetric {
    /// Relative, `/`-separated path under an allowed root.
    pub path: String,
    pub sampled_at: i64,
    pub line_count: u32,
    pub char_count: u64,
    pub link_count: u32,
    pub header_count: u32,
    pub debt_marker_count: u32,
    pub max_header_depth: u8,
    pub format_issue_count: u32,
    pub has_title: bool,
    /// xxh3-64 of the normalized bytes.
    pub content_hash: u64,
}

impl FileMetric {
    pub fn is_empty(&self) -> bool {
        self.line_count == 0
    }

    pub fn is_compliant(&self) -> bool {
        self.format_issue_count == 0
    }
}

/// Corpus-wide metrics derived once per scan cycle. Never edited after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SystemMetric {
    pub sampled_at: i64,
    pub file_count: u32,
    pub total_lines: u64,
    /// Fraction of non-empty files with at least one duplicate partner.
    pub duplication_ratio: f64,
    pub cognitive_steps: f64,
    /// Fraction of files without format issues.
    pub compliance_ratio: f64,
    pub debt_marker_total: u32,
    pub scan_duration_ms: u64,
    pub skipped_files: u32,
    pub root_document_present: bool,
    /// Failures recorded by the previous cycle (store writes, detectors).
    pub cycle_errors: u32,
}
