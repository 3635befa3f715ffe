//! Growth detection: files heading for the size threshold.

use steward_core::constants::SECONDS_PER_DAY;
use steward_core::types::{FileMetric, Severity, Subject, Violation, ViolationKind};

use super::regression::{self, trend_confidence};
use super::types::{day_points, GrowthPattern};

/// Fit the line-count trend of one path.
///
/// Returns `None` with fewer than `min_samples` samples or no time spread.
pub fn growth_pattern(series: &[FileMetric], threshold: u32, min_samples: usize) -> Option<GrowthPattern> {
    if series.len() < min_samples {
        return None;
    }
    let points = day_points(series, |m| m.sampled_at, |m| f64::from(m.line_count));
    let fit = regression::fit(&points)?;
    let current = series.last()?.line_count;

    let remaining = f64::from(threshold) - f64::from(current);
    let time_to_breach = (fit.slope > 0.0 && remaining > 0.0)
        .then(|| remaining / fit.slope * SECONDS_PER_DAY);

    Some(GrowthPattern {
        path: series.last()?.path.clone(),
        growth_rate: fit.slope,
        acceleration: regression::acceleration(&points),
        current,
        r_squared: fit.r_squared,
        samples: fit.n,
        time_to_breach,
        confidence: trend_confidence(fit.n, fit.r_squared),
    })
}

/// A predictive GrowthTrend violation when the rate exceeds
/// `rate_factor × threshold` lines per day.
pub fn growth_violation(pattern: &GrowthPattern, threshold: u32, rate_factor: f64, now: i64) -> Option<Violation> {
    let limit = rate_factor * f64::from(threshold);
    if pattern.growth_rate <= limit {
        return None;
    }
    let severity = match pattern.time_to_breach {
        Some(ttb) if ttb >= SECONDS_PER_DAY => Severity::Medium,
        _ => Severity::High,
    };
    let accel = pattern
        .acceleration
        .map_or_else(|| "n/a".to_string(), |a| format!("{a:+.1}"));
    Some(
        Violation::predictive(
            ViolationKind::GrowthTrend,
            severity,
            Subject::File(pattern.path.clone()),
            f64::from(pattern.current),
            f64::from(threshold),
            pattern.confidence,
            pattern.time_to_breach,
            now,
        )
        .with_message(format!(
            "{} grows {:.1} lines/day (acceleration {accel}), {} of {threshold} lines",
            pattern.path, pattern.growth_rate, pattern.current
        )),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(lines: &[u32], step: i64) -> Vec<FileMetric> {
        lines
            .iter()
            .enumerate()
            .map(|(i, &l)| FileMetric {
                path: "docs/g.md".into(),
                sampled_at: 1_000 + i as i64 * step,
                line_count: l,
                char_count: 0,
                link_count: 0,
                header_count: 0,
                debt_marker_count: 0,
                max_header_depth: 0,
                format_issue_count: 0,
                has_title: true,
                content_hash: 0,
            })
            .collect()
    }

    #[test]
    fn fast_growth_predicts_breach() {
        let s = series(&[800, 950, 1100, 1260], 300);
        let p = growth_pattern(&s, 1500, 3).unwrap();
        let ttb = p.time_to_breach.unwrap();
        assert!(ttb > 0.0 && ttb < 3000.0, "ttb = {ttb}");
        assert!(p.confidence > 0.5 && p.confidence < 0.95);
        let v = growth_violation(&p, 1500, 0.15, 2_000).unwrap();
        assert!(v.predictive);
        assert_eq!(v.severity, Severity::High);
    }

    #[test]
    fn slow_growth_is_ignored() {
        let s = series(&[800, 801, 802], 86_400);
        let p = growth_pattern(&s, 1500, 3).unwrap();
        assert!(growth_violation(&p, 1500, 0.15, 0).is_none());
    }

    #[test]
    fn too_few_samples() {
        assert!(growth_pattern(&series(&[800, 950], 300), 1500, 3).is_none());
    }
}
