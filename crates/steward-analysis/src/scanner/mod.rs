//! Scanner subsystem: corpus discovery, bounded reads, Markdown measurement.
//!
//! The scanner is stateless between cycles. Each `scan_once` walks the allowed
//! roots, reads every Markdown file through a timed reader, and returns a
//! `ScanSnapshot` with one `FileMetric` per file plus the normalized contents
//! the monitor and the pattern detector need.

pub mod hasher;
pub mod markdown;
pub mod reader;
pub mod scanner;
pub mod types;
pub mod walker;

pub use markdown::{measure, normalize, MarkdownStats};
pub use reader::TimedReader;
pub use scanner::CorpusScanner;
pub use types::{RootDocumentProfile, ScanSnapshot, ScannedFile, SkippedFile};
