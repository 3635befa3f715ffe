//! Corpus-wide metrics derived from one snapshot.

use steward_core::types::collections::FxHashSet;
use steward_core::types::SystemMetric;

use super::cognitive::{cognitive_steps, BASE_STEPS};
use super::similarity::SimilarityPair;
use crate::scanner::ScanSnapshot;

/// Build the `SystemMetric` of a snapshot.
///
/// `duplication_ratio` is the fraction of non-empty files that have at least
/// one partner scoring above `duplication_threshold`. A missing root document
/// contributes the base cognitive step count; its absence is reported as a
/// separate violation.
pub fn system_metric(
    snapshot: &ScanSnapshot,
    pairs: &[SimilarityPair],
    duplication_threshold: f64,
    cycle_errors: u32,
) -> SystemMetric {
    let non_empty = snapshot.files.iter().filter(|f| !f.metric.is_empty()).count();
    let duplicated: FxHashSet<&str> = pairs
        .iter()
        .filter(|p| p.score > duplication_threshold)
        .flat_map(|p| [p.a.as_str(), p.b.as_str()])
        .collect();
    let duplication_ratio = if non_empty == 0 {
        0.0
    } else {
        (duplicated.len() as f64 / non_empty as f64).clamp(0.0, 1.0)
    };

    let file_count = snapshot.files.len();
    let compliant = snapshot.files.iter().filter(|f| f.metric.is_compliant()).count();
    let compliance_ratio = if file_count == 0 {
        1.0
    } else {
        compliant as f64 / file_count as f64
    };

    SystemMetric {
        sampled_at: snapshot.sampled_at,
        file_count: file_count as u32,
        total_lines: snapshot.total_lines(),
        duplication_ratio,
        cognitive_steps: snapshot
            .root_document
            .as_ref()
            .map_or(BASE_STEPS, cognitive_steps),
        compliance_ratio,
        debt_marker_total: snapshot
            .files
            .iter()
            .map(|f| f.metric.debt_marker_count)
            .sum(),
        scan_duration_ms: snapshot.duration_ms,
        skipped_files: snapshot.skipped_count(),
        root_document_present: snapshot.root_document.is_some(),
        cycle_errors,
    }
}
