//! Threshold monitor: similarity, cognitive steps, system metrics, violations.

pub mod cognitive;
pub mod reconcile;
pub mod similarity;
pub mod system;
pub mod thresholds;

pub use cognitive::cognitive_steps;
pub use reconcile::{reconcile, Producer, Reconciliation};
pub use similarity::{similarity, SimilarityPair};
pub use system::system_metric;
pub use thresholds::ThresholdMonitor;

use steward_core::types::{SystemMetric, Violation};

use crate::scanner::ScanSnapshot;

/// Everything the monitor derives from one snapshot.
#[derive(Debug, Clone, Default)]
pub struct MonitorReport {
    /// Pairs scoring at least the requested minimum; reused by the cluster detector.
    pub pairs: Vec<SimilarityPair>,
    pub system: SystemMetric,
    pub violations: Vec<Violation>,
}

/// Score document pairs, derive the system metric, and evaluate thresholds.
pub fn monitor_snapshot(
    monitor: &ThresholdMonitor,
    snapshot: &ScanSnapshot,
    min_pair_score: f64,
    cycle_errors: u32,
) -> MonitorReport {
    let pairs = similarity::pairwise(&snapshot.documents(), min_pair_score);
    let system = system_metric(
        snapshot,
        &pairs,
        monitor.config().effective_duplication(),
        cycle_errors,
    );
    let violations = monitor.evaluate(snapshot, &pairs, &system);
    MonitorReport {
        pairs,
        system,
        violations,
    }
}
