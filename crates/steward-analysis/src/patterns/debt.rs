//! Debt accumulation: per-file slope of debt markers.

use steward_core::types::{FileMetric, Severity, Subject, Violation, ViolationKind};

use super::regression::{self, trend_confidence};
use super::types::day_points;

/// A predictive TechnicalDebt violation when the marker count of one file
/// grows faster than `slope_limit` markers per day.
pub fn debt_violation(series: &[FileMetric], slope_limit: f64, min_samples: usize, now: i64) -> Option<Violation> {
    if series.len() < min_samples {
        return None;
    }
    let points = day_points(series, |m| m.sampled_at, |m| f64::from(m.debt_marker_count));
    let fit = regression::fit(&points)?;
    if fit.slope <= slope_limit {
        return None;
    }
    let last = series.last()?;
    Some(
        Violation::predictive(
            ViolationKind::TechnicalDebt,
            Severity::Medium,
            Subject::File(last.path.clone()),
            fit.slope,
            slope_limit,
            trend_confidence(fit.n, fit.r_squared),
            None,
            now,
        )
        .with_message(format!(
            "{} accumulates {:.2} debt markers/day ({} now)",
            last.path, fit.slope, last.debt_marker_count
        )),
    )
}
