//! Pattern detector: predictive violations from metric history.
//!
//! - `growth`: least-squares line-count trends and time to breach.
//! - `clusters`: connected components of the similarity graph.
//! - `debt`: per-file debt marker accumulation.
//! - `performance`: cognitive steps degradation.
//! - `anomaly`: isolation forest over per-file features.
//! - `correlation`: Pearson correlation of daily violation counts.

pub mod anomaly;
pub mod clusters;
pub mod correlation;
pub mod debt;
pub mod detector;
pub mod growth;
pub mod performance;
pub mod regression;
pub mod types;

pub use detector::PatternDetector;
pub use types::{DetectionReport, DetectorInput, GrowthPattern};
