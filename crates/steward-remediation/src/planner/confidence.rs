//! Action confidence and duration estimates.
//!
//! ```text
//! excess     = |current − threshold| / threshold
//! confidence = 0.5 + 0.45·(1 − e^(−k·excess))      k per action kind
//! predictive : confidence · violation.confidence
//! result     = clamp(confidence, 0.50, 0.95)
//! ```

use steward_core::types::{ActionKind, Violation};

pub const MIN_CONFIDENCE: f64 = 0.50;
pub const MAX_CONFIDENCE: f64 = 0.95;
/// Lines per unit of duration scaling.
pub const LINES_PER_SCALE: f64 = 1000.0;

/// How quickly confidence saturates with the excess over the threshold.
pub fn steepness(kind: ActionKind) -> f64 {
    match kind {
        ActionKind::Modularize => 3.0,
        ActionKind::Consolidate => 4.0,
        ActionKind::ResolveDebt => 2.0,
        ActionKind::OptimizeStructure => 2.5,
        ActionKind::ConvertFormat => 5.0,
        ActionKind::EmergencyHalt => 0.0,
    }
}

/// Relative distance from the threshold; the absolute distance when the
/// threshold is zero.
pub fn excess(current: f64, threshold: f64) -> f64 {
    let distance = (current - threshold).abs();
    if threshold.abs() < f64::EPSILON {
        distance
    } else {
        distance / threshold.abs()
    }
}

pub fn confidence(kind: ActionKind, violation: &Violation) -> f64 {
    if kind == ActionKind::EmergencyHalt {
        return MAX_CONFIDENCE;
    }
    let x = excess(violation.current_value, violation.threshold_value);
    let mut c = MIN_CONFIDENCE + (MAX_CONFIDENCE - MIN_CONFIDENCE) * (1.0 - (-steepness(kind) * x).exp());
    if violation.predictive {
        c *= violation.confidence;
    }
    if c.is_nan() {
        return MIN_CONFIDENCE;
    }
    c.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

/// Base duration scaled by the size of the subjects.
pub fn estimated_duration_s(kind: ActionKind, subject_lines: u64) -> f64 {
    kind.base_duration_s() * (1.0 + subject_lines as f64 / LINES_PER_SCALE)
}

#[cfg(test)]
mod tests {
    use steward_core::types::{Severity, Subject, ViolationKind};

    use super::*;

    fn file_size(lines: f64) -> Violation {
        Violation::reactive(
            ViolationKind::FileSize,
            Severity::Medium,
            Subject::File("docs/a.md".into()),
            lines,
            1500.0,
            0,
        )
    }

    #[test]
    fn grows_with_excess_and_stays_bounded() {
        let near = confidence(ActionKind::Modularize, &file_size(1600.0));
        let far = confidence(ActionKind::Modularize, &file_size(2100.0));
        let huge = confidence(ActionKind::Modularize, &file_size(1e9));
        assert!(near < far && far < huge);
        assert!((far - 0.8146).abs() < 1e-3, "{far}");
        assert!(near >= MIN_CONFIDENCE);
        assert!((huge - MAX_CONFIDENCE).abs() < 1e-9);
    }

    #[test]
    fn predictive_confidence_is_scaled_then_clamped() {
        let v = Violation::predictive(
            ViolationKind::GrowthTrend,
            Severity::High,
            Subject::File("docs/a.md".into()),
            3000.0,
            1500.0,
            0.6,
            Some(600.0),
            0,
        );
        let c = confidence(ActionKind::Modularize, &v);
        let reactive = confidence(ActionKind::Modularize, &file_size(3000.0));
        assert!((c - (reactive * 0.6).max(MIN_CONFIDENCE)).abs() < 1e-9);
    }

    #[test]
    fn zero_threshold_and_durations() {
        assert_eq!(excess(3.0, 0.0), 3.0);
        assert_eq!(estimated_duration_s(ActionKind::Modularize, 2000), 90.0);
        assert_eq!(estimated_duration_s(ActionKind::EmergencyHalt, 0), 1.0);
    }
}
