//! Least-squares trend fitting.

use serde::Serialize;

/// Ordinary least-squares line through `(x, y)` points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination in [0, 1]; 1 for a perfect fit.
    pub r_squared: f64,
    pub n: usize,
}

/// Fit a line; `None` with fewer than two points or no spread in `x`.
pub fn fit(points: &[(f64, f64)]) -> Option<LinearFit> {
    let n = points.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / nf;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / nf;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for &(x, y) in points {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx <= 0.0 || !sxx.is_finite() {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let r_squared = if syy <= 0.0 {
        1.0
    } else {
        let ss_res: f64 = points
            .iter()
            .map(|&(x, y)| {
                let e = y - (intercept + slope * x);
                e * e
            })
            .sum();
        (1.0 - ss_res / syy).clamp(0.0, 1.0)
    };
    Some(LinearFit {
        slope,
        intercept,
        r_squared,
        n,
    })
}

/// Slope between two points; `None` when they share an x.
pub fn pair_slope(a: (f64, f64), b: (f64, f64)) -> Option<f64> {
    let dx = b.0 - a.0;
    (dx != 0.0).then(|| (b.1 - a.1) / dx)
}

/// Change between the last two consecutive slopes of the series.
pub fn acceleration(points: &[(f64, f64)]) -> Option<f64> {
    let n = points.len();
    if n < 3 {
        return None;
    }
    let last = pair_slope(points[n - 2], points[n - 1])?;
    let previous = pair_slope(points[n - 3], points[n - 2])?;
    Some(last - previous)
}

/// Trend confidence: saturating in the sample count, scaled by fit quality.
///
/// `clamp(0.5 + 0.45·(1 − 1/(n−1))·r², 0.5, 0.95)`
pub fn trend_confidence(n: usize, r_squared: f64) -> f64 {
    if n < 2 {
        return 0.5;
    }
    let saturation = 1.0 - 1.0 / (n as f64 - 1.0);
    (0.5 + 0.45 * saturation * r_squared.clamp(0.0, 1.0)).clamp(0.5, 0.95)
}
