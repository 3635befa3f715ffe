//! Pattern detector input and intermediate results.

use std::collections::BTreeMap;

use serde::Serialize;
use steward_core::constants::SECONDS_PER_DAY;
use steward_core::types::{FileMetric, SystemMetric, Violation, ViolationKind};

use crate::monitor::SimilarityPair;

/// A read-only snapshot of everything the detectors consume.
///
/// Histories are keyed and ordered, so the same store contents always produce
/// the same input.
#[derive(Debug, Clone, Default)]
pub struct DetectorInput {
    pub now: i64,
    /// Per-path samples, oldest first.
    pub file_history: BTreeMap<String, Vec<FileMetric>>,
    /// System samples, oldest first.
    pub system_history: Vec<SystemMetric>,
    /// Similarity pairs of the latest snapshot.
    pub pairs: Vec<SimilarityPair>,
    /// `(kind, day, count)` of violations opened per UTC day.
    pub violation_counts: Vec<(ViolationKind, i64, u32)>,
}

impl DetectorInput {
    /// Group a flat history (as returned by the store) per path.
    pub fn group_history(samples: Vec<FileMetric>) -> BTreeMap<String, Vec<FileMetric>> {
        let mut grouped: BTreeMap<String, Vec<FileMetric>> = BTreeMap::new();
        for m in samples {
            grouped.entry(m.path.clone()).or_default().push(m);
        }
        for series in grouped.values_mut() {
            series.sort_by_key(|m| m.sampled_at);
        }
        grouped
    }

    /// Most recent sample of every path that still appears in the corpus.
    ///
    /// Every scan samples the whole corpus at one timestamp, so a path whose
    /// last sample predates the newest scan was deleted (or unreadable) since.
    pub fn latest(&self) -> Vec<&FileMetric> {
        let Some(scanned_at) = self.last_scan() else {
            return Vec::new();
        };
        self.file_history
            .values()
            .filter_map(|s| s.last())
            .filter(|m| m.sampled_at >= scanned_at)
            .collect()
    }

    /// Timestamp of the newest scan in the input.
    pub fn last_scan(&self) -> Option<i64> {
        let files = self.file_history.values().filter_map(|s| s.last()).map(|m| m.sampled_at);
        let system = self.system_history.last().map(|m| m.sampled_at);
        files.chain(system).max()
    }
}

/// Convert a timestamp series to `(days since first sample, value)`.
pub fn day_points<T>(samples: &[T], at: impl Fn(&T) -> i64, value: impl Fn(&T) -> f64) -> Vec<(f64, f64)> {
    let Some(first) = samples.first().map(&at) else {
        return Vec::new();
    };
    samples
        .iter()
        .map(|s| ((at(s) - first) as f64 / SECONDS_PER_DAY, value(s)))
        .collect()
}

/// Growth trend of one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthPattern {
    pub path: String,
    /// Lines per day.
    pub growth_rate: f64,
    /// Change between the last two consecutive slopes, lines/day.
    pub acceleration: Option<f64>,
    pub current: u32,
    pub r_squared: f64,
    pub samples: usize,
    /// Seconds until the size threshold is crossed.
    pub time_to_breach: Option<f64>,
    pub confidence: f64,
}

/// Output of one detector pass.
#[derive(Debug, Clone, Default)]
pub struct DetectionReport {
    /// Predictive violations sorted by key.
    pub violations: Vec<Violation>,
    pub growth: Vec<GrowthPattern>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(path: &str, at: i64) -> FileMetric {
        FileMetric {
            path: path.to_string(),
            sampled_at: at,
            line_count: 10,
            char_count: 200,
            link_count: 0,
            header_count: 1,
            debt_marker_count: 0,
            max_header_depth: 1,
            format_issue_count: 0,
            has_title: true,
            content_hash: 0,
        }
    }

    #[test]
    fn latest_leaves_out_files_missing_from_the_newest_scan() {
        let input = DetectorInput {
            now: 300,
            file_history: DetectorInput::group_history(vec![
                sample("docs/a.md", 100),
                sample("docs/gone.md", 100),
                sample("docs/a.md", 200),
                sample("docs/b.md", 200),
            ]),
            ..DetectorInput::default()
        };
        let paths: Vec<&str> = input.latest().iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["docs/a.md", "docs/b.md"]);
        assert_eq!(input.last_scan(), Some(200));
        assert!(DetectorInput::default().latest().is_empty());
    }
}
