//! SLO tracker: samples the five KPIs over a sliding window.
//!
//! | KPI                | value                                             | empty window |
//! |--------------------|---------------------------------------------------|--------------|
//! | prevention_rate    | (predictive or closed) / opened                   | 1.0          |
//! | response_time      | mean(finished_at − detected_at), Completed only   | skipped      |
//! | system_reliability | 1 − failed / finished                             | 1.0          |
//! | compliance_ratio   | latest SystemMetric                               | skipped      |
//! | cognitive_steps    | latest SystemMetric                               | skipped      |

use std::sync::Arc;

use steward_core::config::SloConfig;
use steward_core::errors::StorageError;
use steward_core::events::{EventDispatcher, GovernanceEvent, SloBreachedEvent};
use steward_core::types::{Action, ActionStatus, SloMetric, SloSample, Violation};
use steward_storage::MetricStore;

/// Share of violations opened in the window that were either forecast or
/// have since been closed.
pub fn prevention_rate(opened: &[Violation]) -> f64 {
    if opened.is_empty() {
        return 1.0;
    }
    let prevented = opened
        .iter()
        .filter(|v| v.predictive || v.closed_at.is_some())
        .count();
    prevented as f64 / opened.len() as f64
}

/// Mean seconds from detection to completion. `None` without samples.
pub fn response_time(latencies: &[f64]) -> Option<f64> {
    if latencies.is_empty() {
        return None;
    }
    Some(latencies.iter().sum::<f64>() / latencies.len() as f64)
}

/// One minus the failed share of finished actions.
pub fn reliability(finished: &[Action]) -> f64 {
    let done: Vec<&Action> = finished.iter().filter(|a| a.status.is_finished()).collect();
    if done.is_empty() {
        return 1.0;
    }
    let failed = done.iter().filter(|a| a.status == ActionStatus::Failed).count();
    1.0 - failed as f64 / done.len() as f64
}

pub struct SloTracker {
    store: Arc<MetricStore>,
    config: SloConfig,
    events: EventDispatcher,
}

impl SloTracker {
    pub fn new(store: Arc<MetricStore>, config: SloConfig) -> Self {
        Self {
            store,
            config,
            events: EventDispatcher::new(),
        }
    }

    pub fn with_events(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &SloConfig {
        &self.config
    }

    /// Evaluate every KPI that has data at `now`, without persisting.
    pub fn measure(&self, now: i64) -> Result<Vec<SloSample>, StorageError> {
        let since = now - self.config.effective_window_s() as i64;
        let mut samples = Vec::with_capacity(SloMetric::ALL.len());
        let mut push = |metric: SloMetric, value: f64| {
            samples.push(SloSample::evaluate(metric, value, self.config.target(metric), now));
        };

        let opened = self.store.violations_opened_since(since)?;
        push(SloMetric::PreventionRate, prevention_rate(&opened));

        let finished = self.store.actions_finished_since(since)?;
        let mut latencies = Vec::new();
        for action in finished.iter().filter(|a| a.status == ActionStatus::Completed) {
            let (Some(done), Some(violation)) = (action.finished_at, self.store.violation(&action.violation_id)?)
            else {
                continue;
            };
            latencies.push((done - violation.detected_at).max(0) as f64);
        }
        if let Some(mean) = response_time(&latencies) {
            push(SloMetric::ResponseTime, mean);
        }
        push(SloMetric::SystemReliability, reliability(&finished));

        if let Some(system) = self.store.latest_system_metric()? {
            push(SloMetric::ComplianceRatio, system.compliance_ratio);
            push(SloMetric::CognitiveSteps, system.cognitive_steps);
        }
        Ok(samples)
    }

    /// Measure, persist, and publish `slo.breached` for every non-compliant KPI.
    ///
    /// Samples are append-only per KPI: a `now` at or before the previous
    /// sample fails with `OutOfOrder` and nothing is written.
    pub fn sample(&self, now: i64) -> Result<Vec<SloSample>, StorageError> {
        let samples = self.measure(now)?;
        for sample in &samples {
            self.store.put_slo_sample(sample)?;
        }
        for sample in &samples {
            tracing::debug!(metric = %sample.metric, value = sample.value, slo_deviation = sample.deviation, "slo sampled");
            if let Some(severity) = sample.alert_severity() {
                tracing::warn!(
                    metric = %sample.metric,
                    value = sample.value,
                    target = sample.target,
                    slo_deviation = sample.deviation,
                    severity = severity.name(),
                    "slo breached"
                );
                self.events.emit(&GovernanceEvent::SloBreached(SloBreachedEvent {
                    sample: sample.clone(),
                    severity,
                }));
            }
        }
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use steward_core::types::{Severity, Subject, ViolationKind};

    use super::*;

    fn violation(predictive: bool, closed: bool) -> Violation {
        let mut v = if predictive {
            Violation::predictive(
                ViolationKind::GrowthTrend,
                Severity::Medium,
                Subject::File("docs/a.md".into()),
                1200.0,
                1500.0,
                0.8,
                None,
                0,
            )
        } else {
            Violation::reactive(
                ViolationKind::FileSize,
                Severity::High,
                Subject::File("docs/a.md".into()),
                1600.0,
                1500.0,
                0,
            )
        };
        v.closed_at = closed.then_some(10);
        v
    }

    #[test]
    fn prevention_counts_forecasts_and_closures() {
        assert_eq!(prevention_rate(&[]), 1.0);
        let opened = [violation(true, false), violation(false, true), violation(false, false), violation(false, false)];
        assert!((prevention_rate(&opened) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn response_time_is_skipped_without_samples() {
        assert_eq!(response_time(&[]), None);
        assert_eq!(response_time(&[100.0, 300.0]), Some(200.0));
    }
}
