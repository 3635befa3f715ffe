//! Overall health in [0, 1].
//!
//! The mean of three components:
//! - worker availability: share of supervised workers that are Active;
//! - SLO compliance: share of the latest KPI samples that are compliant;
//! - violation headroom: `1 − Σ weight(open Critical/High)`, floored at 0.

use serde::Serialize;
use steward_core::types::{Severity, SloSample, SubsystemHeartbeat, Violation, WorkerStatus};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HealthScore {
    pub overall: f64,
    pub worker_availability: f64,
    pub slo_compliance: f64,
    pub violation_headroom: f64,
}

/// 1.0 when nothing is supervised (single-cycle runs).
pub fn worker_availability(heartbeats: &[SubsystemHeartbeat]) -> f64 {
    if heartbeats.is_empty() {
        return 1.0;
    }
    let active = heartbeats
        .iter()
        .filter(|h| h.status == WorkerStatus::Active)
        .count();
    active as f64 / heartbeats.len() as f64
}

pub fn slo_compliance(samples: &[SloSample]) -> f64 {
    if samples.is_empty() {
        return 1.0;
    }
    samples.iter().filter(|s| s.compliant).count() as f64 / samples.len() as f64
}

pub fn violation_headroom(open: &[Violation]) -> f64 {
    let pressure: f64 = open
        .iter()
        .filter(|v| v.is_open() && v.severity >= Severity::High)
        .map(|v| v.severity.weight())
        .sum();
    (1.0 - pressure).clamp(0.0, 1.0)
}

pub fn overall_health(
    heartbeats: &[SubsystemHeartbeat],
    samples: &[SloSample],
    open: &[Violation],
) -> HealthScore {
    let worker_availability = worker_availability(heartbeats);
    let slo_compliance = slo_compliance(samples);
    let violation_headroom = violation_headroom(open);
    HealthScore {
        overall: (worker_availability + slo_compliance + violation_headroom) / 3.0,
        worker_availability,
        slo_compliance,
        violation_headroom,
    }
}

#[cfg(test)]
mod tests {
    use steward_core::types::{SloMetric, Subject, ViolationKind};

    use super::*;

    fn beat(worker: &str, status: WorkerStatus) -> SubsystemHeartbeat {
        SubsystemHeartbeat {
            worker: worker.to_string(),
            last_beat_at: 0,
            status,
            error_count: 0,
            uptime_seconds: 0.0,
            restart_count: 0,
        }
    }

    fn open(severity: Severity, path: &str) -> Violation {
        Violation::reactive(ViolationKind::FileSize, severity, Subject::File(path.into()), 2.0, 1.0, 0)
    }

    #[test]
    fn healthy_system_scores_one() {
        let h = overall_health(&[beat("scanner", WorkerStatus::Active)], &[], &[]);
        assert_eq!(h.overall, 1.0);
    }

    #[test]
    fn components_average() {
        let beats = [beat("scanner", WorkerStatus::Active), beat("executor", WorkerStatus::Error)];
        let samples = [
            SloSample::evaluate(SloMetric::ComplianceRatio, 1.0, 0.95, 0),
            SloSample::evaluate(SloMetric::CognitiveSteps, 4.0, 2.5, 0),
        ];
        let violations = [open(Severity::Critical, "docs/a.md"), open(Severity::Low, "docs/b.md")];
        let h = overall_health(&beats, &samples, &violations);
        assert_eq!(h.worker_availability, 0.5);
        assert_eq!(h.slo_compliance, 0.5);
        assert!((h.violation_headroom - 0.6).abs() < 1e-12);
        assert!((h.overall - 1.6 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn headroom_floors_at_zero() {
        let many: Vec<Violation> = (0..4).map(|i| open(Severity::Critical, &format!("docs/{i}.md"))).collect();
        assert_eq!(violation_headroom(&many), 0.0);
    }
}
