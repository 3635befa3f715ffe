//! Steward analysis engine.
//!
//! Three stages over the Markdown corpus:
//! - `scanner`: walk the allowed roots and measure every file.
//! - `monitor`: compare the latest measurements with the configured thresholds.
//! - `patterns`: read metric history and forecast violations before they happen.

pub mod monitor;
pub mod patterns;
pub mod scanner;

pub use monitor::{ThresholdMonitor, SimilarityPair};
pub use patterns::{DetectorInput, PatternDetector};
pub use scanner::{CorpusScanner, ScanSnapshot};
