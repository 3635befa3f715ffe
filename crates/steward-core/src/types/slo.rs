//! SLO samples.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Severity;

/// KPIs tracked by the SLO tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SloMetric {
    PreventionRate,
    ResponseTime,
    SystemReliability,
    ComplianceRatio,
    CognitiveSteps,
}

/// Which side of the target is good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

impl SloMetric {
    pub const ALL: [SloMetric; 5] = [
        Self::PreventionRate,
        Self::ResponseTime,
        Self::SystemReliability,
        Self::ComplianceRatio,
        Self::CognitiveSteps,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::PreventionRate => "prevention_rate",
            Self::ResponseTime => "response_time",
            Self::SystemReliability => "system_reliability",
            Self::ComplianceRatio => "compliance_ratio",
            Self::CognitiveSteps => "cognitive_steps",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == s)
    }

    pub fn direction(&self) -> Direction {
        match self {
            Self::ResponseTime | Self::CognitiveSteps => Direction::LowerIsBetter,
            _ => Direction::HigherIsBetter,
        }
    }
}

impl fmt::Display for SloMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One immutable KPI sample compared to its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SloSample {
    pub metric: SloMetric,
    pub sampled_at: i64,
    pub value: f64,
    pub target: f64,
    pub compliant: bool,
    /// Relative shortfall against the target; <= 0 when compliant.
    pub deviation: f64,
}

impl SloSample {
    pub fn evaluate(metric: SloMetric, value: f64, target: f64, sampled_at: i64) -> Self {
        let deviation = relative_deviation(metric.direction(), value, target);
        Self {
            metric,
            sampled_at,
            value,
            target,
            compliant: deviation <= 0.0,
            deviation,
        }
    }

    /// Alert severity, proportional to deviation. `None` when compliant.
    pub fn alert_severity(&self) -> Option<Severity> {
        if self.compliant {
            return None;
        }
        Some(match self.deviation {
            d if d < 0.10 => Severity::Low,
            d if d < 0.50 => Severity::Medium,
            d if d <= 1.00 => Severity::High,
            _ => Severity::Critical,
        })
    }
}

fn relative_deviation(direction: Direction, value: f64, target: f64) -> f64 {
    let gap = match direction {
        Direction::HigherIsBetter => target - value,
        Direction::LowerIsBetter => value - target,
    };
    if target.abs() < f64::EPSILON {
        gap
    } else {
        gap / target.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_time_twice_target_is_high() {
        let s = SloSample::evaluate(SloMetric::ResponseTime, 600.0, 300.0, 0);
        assert!(!s.compliant);
        assert!((s.deviation - 1.0).abs() < 1e-9);
        assert_eq!(s.alert_severity(), Some(Severity::High));

        let worse = SloSample::evaluate(SloMetric::ResponseTime, 700.0, 300.0, 0);
        assert_eq!(worse.alert_severity(), Some(Severity::Critical));
    }

    #[test]
    fn higher_is_better_compliance() {
        let ok = SloSample::evaluate(SloMetric::PreventionRate, 0.97, 0.95, 0);
        assert!(ok.compliant);
        assert!(ok.deviation < 0.0);
        assert_eq!(ok.alert_severity(), None);

        let low = SloSample::evaluate(SloMetric::SystemReliability, 0.9, 0.995, 0);
        assert!(!low.compliant);
        assert_eq!(low.alert_severity(), Some(Severity::Low));
    }
}
