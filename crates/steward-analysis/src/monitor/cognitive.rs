//! Cognitive steps: navigation complexity of the root document.
//!
//! ```text
//! raw   = 1.0 + 0.02·headers + 0.01·links + 0.25·max(0, max_header_depth − 3)
//! steps = quick_nav ? 1.0 + 0.5·(raw − 1.0) : raw
//! steps = clamp(steps, 1.0, 10.0)
//! ```

use crate::scanner::RootDocumentProfile;

pub const BASE_STEPS: f64 = 1.0;
pub const HEADER_COEFFICIENT: f64 = 0.02;
pub const LINK_COEFFICIENT: f64 = 0.01;
pub const DEPTH_COEFFICIENT: f64 = 0.25;
/// Header depth reachable without extra steps.
pub const FREE_DEPTH: u8 = 3;
/// Fraction of the excess over the base kept when a quick-navigation block exists.
pub const QUICK_NAV_FACTOR: f64 = 0.5;
pub const MAX_STEPS: f64 = 10.0;

/// Cognitive steps of the given navigation profile.
pub fn cognitive_steps(profile: &RootDocumentProfile) -> f64 {
    let excess_depth = profile.max_header_depth.saturating_sub(FREE_DEPTH);
    let raw = BASE_STEPS
        + HEADER_COEFFICIENT * f64::from(profile.header_count)
        + LINK_COEFFICIENT * f64::from(profile.link_count)
        + DEPTH_COEFFICIENT * f64::from(excess_depth);
    let steps = if profile.quick_nav_present {
        BASE_STEPS + QUICK_NAV_FACTOR * (raw - BASE_STEPS)
    } else {
        raw
    };
    steps.clamp(BASE_STEPS, MAX_STEPS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(headers: u32, links: u32, depth: u8, quick_nav: bool) -> RootDocumentProfile {
        RootDocumentProfile {
            path: "docs/README.md".into(),
            header_count: headers,
            link_count: links,
            max_header_depth: depth,
            quick_nav_present: quick_nav,
        }
    }

    #[test]
    fn coefficients_are_locked() {
        assert!((cognitive_steps(&profile(0, 0, 0, false)) - 1.0).abs() < 1e-12);
        // 1 + 0.02·50 + 0.01·60 + 0.25·2 = 3.1
        assert!((cognitive_steps(&profile(50, 60, 5, false)) - 3.1).abs() < 1e-12);
        // Quick navigation halves the excess: 1 + 0.5·2.1 = 2.05
        assert!((cognitive_steps(&profile(50, 60, 5, true)) - 2.05).abs() < 1e-12);
    }

    #[test]
    fn result_is_clamped() {
        assert_eq!(cognitive_steps(&profile(10_000, 10_000, 6, false)), MAX_STEPS);
    }
}
