//! Correlation between violation kinds over daily buckets.

use std::collections::BTreeMap;

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};
use steward_core::types::{Severity, Subject, Violation, ViolationKind};

/// Minimum number of daily buckets for a correlation.
pub const MIN_BUCKETS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KindCorrelation {
    pub a: ViolationKind,
    pub b: ViolationKind,
    pub r: f64,
    pub buckets: usize,
    /// Two-sided p-value of `r` under the null hypothesis of no correlation.
    pub p_value: f64,
}

/// Pearson r; `None` when either series has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len();
    if n != y.len() || n < 2 {
        return None;
    }
    let nf = n as f64;
    let mx = x.iter().sum::<f64>() / nf;
    let my = y.iter().sum::<f64>() / nf;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0))
}

/// Two-sided p-value of Pearson `r` over `n` samples (t-test, n − 2 dof).
pub fn p_value(r: f64, n: usize) -> f64 {
    if n < 3 {
        return 1.0;
    }
    let df = n as f64 - 2.0;
    let denom = 1.0 - r * r;
    if denom <= f64::EPSILON {
        return 0.0;
    }
    let t = r.abs() * (df / denom).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * (1.0 - dist.cdf(t))).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

/// Correlations with `|r| > threshold` between every pair of kinds.
///
/// Days between the first and last bucket with no violations of a kind count
/// as zero. Correlation violations themselves are left out.
pub fn correlate(counts: &[(ViolationKind, i64, u32)], threshold: f64) -> Vec<KindCorrelation> {
    let counts: Vec<&(ViolationKind, i64, u32)> = counts
        .iter()
        .filter(|(k, _, _)| *k != ViolationKind::Correlation)
        .collect();
    let (Some(first), Some(last)) = (
        counts.iter().map(|c| c.1).min(),
        counts.iter().map(|c| c.1).max(),
    ) else {
        return Vec::new();
    };
    let buckets = (last - first + 1) as usize;
    if buckets < MIN_BUCKETS {
        return Vec::new();
    }

    let mut series: BTreeMap<ViolationKind, Vec<f64>> = BTreeMap::new();
    for (kind, day, count) in counts {
        let row = series.entry(*kind).or_insert_with(|| vec![0.0; buckets]);
        row[(*day - first) as usize] += f64::from(*count);
    }

    let kinds: Vec<ViolationKind> = series.keys().copied().collect();
    let mut out = Vec::new();
    for (i, a) in kinds.iter().enumerate() {
        for b in &kinds[i + 1..] {
            let Some(r) = pearson(&series[a], &series[b]) else {
                continue;
            };
            if r.abs() > threshold {
                out.push(KindCorrelation {
                    a: *a,
                    b: *b,
                    r,
                    buckets,
                    p_value: p_value(r, buckets),
                });
            }
        }
    }
    out
}

pub fn correlation_violation(c: &KindCorrelation, threshold: f64, now: i64) -> Violation {
    Violation::predictive(
        ViolationKind::Correlation,
        Severity::Low,
        Subject::pair(c.a.name(), c.b.name()),
        c.r,
        threshold,
        1.0 - c.p_value,
        None,
        now,
    )
    .with_message(format!(
        "{} and {} violations move together (r = {:.2} over {} days)",
        c.a, c.b, c.r, c.buckets
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pearson_known_values() {
        assert!((pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap() + 1.0).abs() < 1e-12);
        assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn co_moving_kinds_correlate() {
        let counts = vec![
            (ViolationKind::FileSize, 100, 1),
            (ViolationKind::FileSize, 101, 3),
            (ViolationKind::FileSize, 102, 5),
            (ViolationKind::FileSize, 103, 7),
            (ViolationKind::Duplication, 100, 2),
            (ViolationKind::Duplication, 101, 4),
            (ViolationKind::Duplication, 102, 7),
            (ViolationKind::Duplication, 103, 8),
        ];
        let found = correlate(&counts, 0.7);
        assert_eq!(found.len(), 1);
        assert!(found[0].r > 0.9);
        let v = correlation_violation(&found[0], 0.7, 0);
        assert!(v.confidence > 0.9 && v.confidence <= 1.0);
    }

    #[test]
    fn too_few_days() {
        let counts = vec![
            (ViolationKind::FileSize, 100, 1),
            (ViolationKind::Duplication, 101, 1),
        ];
        assert!(correlate(&counts, 0.7).is_empty());
    }
}
