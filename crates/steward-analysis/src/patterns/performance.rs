//! Performance degradation: slope of the system cognitive steps.

use steward_core::constants::SECONDS_PER_DAY;
use steward_core::types::{Severity, Subject, SystemMetric, Violation, ViolationKind};

use super::regression::{self, trend_confidence};
use super::types::day_points;

/// A predictive NavigationPerformance violation when cognitive steps rise
/// faster than `slope_limit` per day. Samples without a root document are
/// ignored.
pub fn performance_violation(
    history: &[SystemMetric],
    max_steps: f64,
    slope_limit: f64,
    min_samples: usize,
    now: i64,
) -> Option<Violation> {
    let series: Vec<&SystemMetric> = history.iter().filter(|m| m.root_document_present).collect();
    if series.len() < min_samples {
        return None;
    }
    let points = day_points(&series, |m| m.sampled_at, |m| m.cognitive_steps);
    let fit = regression::fit(&points)?;
    if fit.slope <= slope_limit {
        return None;
    }
    let current = series.last()?.cognitive_steps;
    let remaining = max_steps - current;
    let time_to_breach = (remaining > 0.0).then(|| remaining / fit.slope * SECONDS_PER_DAY);
    let severity = match time_to_breach {
        Some(ttb) if ttb >= SECONDS_PER_DAY => Severity::Medium,
        _ => Severity::High,
    };
    Some(
        Violation::predictive(
            ViolationKind::NavigationPerformance,
            severity,
            Subject::System,
            fit.slope,
            slope_limit,
            trend_confidence(fit.n, fit.r_squared),
            time_to_breach,
            now,
        )
        .with_message(format!(
            "cognitive steps rise {:.3}/day ({current:.2} now, limit {max_steps})",
            fit.slope
        )),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(at: i64, steps: f64) -> SystemMetric {
        SystemMetric {
            sampled_at: at,
            cognitive_steps: steps,
            root_document_present: true,
            ..Default::default()
        }
    }

    #[test]
    fn degradation_is_forecast() {
        let day = 86_400;
        let h = vec![sample(0, 1.5), sample(day, 1.7), sample(2 * day, 1.9)];
        let v = performance_violation(&h, 2.5, 0.10, 3, 2 * day).unwrap();
        // 0.6 steps left at 0.2/day: three days.
        let ttb = v.time_to_breach.unwrap();
        assert!((ttb - 3.0 * 86_400.0).abs() < 1.0);
        assert_eq!(v.severity, Severity::Medium);
    }

    #[test]
    fn stable_navigation_is_quiet() {
        let day = 86_400;
        let h = vec![sample(0, 2.0), sample(day, 2.01), sample(2 * day, 2.02)];
        assert!(performance_violation(&h, 2.5, 0.10, 3, 0).is_none());
    }
}
