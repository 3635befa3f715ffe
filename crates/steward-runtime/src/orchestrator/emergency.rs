//! Emergency mode. The executor's latch is the single source of truth: while
//! it is set no action is dispatched and held plans wait for clearance.

use std::sync::atomic::Ordering;

use steward_core::config::EmergencyConfig;
use steward_core::events::{EmergencyClearedEvent, EmergencyEnteredEvent, GovernanceEvent};
use steward_core::types::{Severity, SloMetric, SloSample, Violation};

use super::Orchestrator;

/// Reasons to enter emergency mode given the current state. Empty when healthy.
pub fn emergency_triggers(
    config: &EmergencyConfig,
    open: &[Violation],
    samples: &[SloSample],
    health: f64,
) -> Vec<String> {
    let mut reasons = Vec::new();

    let critical = open
        .iter()
        .filter(|v| v.is_open() && v.severity == Severity::Critical)
        .count();
    let max_critical = config.effective_max_open_critical() as usize;
    if critical >= max_critical {
        reasons.push(format!("{critical} open critical violations (limit {max_critical})"));
    }

    let factor = config.effective_response_time_factor();
    if let Some(rt) = samples.iter().find(|s| s.metric == SloMetric::ResponseTime) {
        if rt.deviation > factor - 1.0 {
            reasons.push(format!(
                "response time {:.0}s exceeds {factor}x its {:.0}s target",
                rt.value, rt.target
            ));
        }
    }

    let floor = config.effective_min_health();
    if health < floor {
        reasons.push(format!("overall health {health:.2} below {floor:.2}"));
    }
    reasons
}

impl Orchestrator {
    pub fn in_emergency(&self) -> bool {
        self.latch.is_set()
    }

    pub fn emergency_reason(&self) -> Option<String> {
        self.latch.reason()
    }

    /// Enter emergency mode. Idempotent: only the first call announces it.
    pub fn enter_emergency(&self, reason: impl Into<String>) -> bool {
        self.latch.trip(reason);
        self.announce()
    }

    /// Emit `emergency.entered` once per emergency, including when an
    /// EmergencyHalt action set the latch from inside the executor.
    pub(super) fn announce(&self) -> bool {
        if !self.latch.is_set() || self.announced.swap(true, Ordering::SeqCst) {
            return false;
        }
        let reason = self.latch.reason().unwrap_or_default();
        tracing::error!(%reason, "entering emergency mode");
        self.events.emit(&GovernanceEvent::EmergencyEntered(EmergencyEnteredEvent {
            reason,
            entered_at: self.clock.now(),
        }));
        true
    }

    /// Second stop signal: in-flight actions are cancelled and roll back.
    pub fn escalate_emergency(&self) -> usize {
        self.enter_emergency("shutdown requested during remediation");
        if self.escalated.swap(true, Ordering::SeqCst) {
            return 0;
        }
        let cancelled = self.executor.cancel_running();
        tracing::warn!(cancelled, "cancelling running actions");
        cancelled
    }

    /// External clearance. Held plans become dispatchable again.
    pub fn clear_emergency(&self) -> bool {
        if !self.latch.clear() {
            return false;
        }
        self.announced.store(false, Ordering::SeqCst);
        self.escalated.store(false, Ordering::SeqCst);
        tracing::info!("emergency mode cleared");
        self.events.emit(&GovernanceEvent::EmergencyCleared(EmergencyClearedEvent {
            cleared_at: self.clock.now(),
        }));
        true
    }
}

#[cfg(test)]
mod tests {
    use steward_core::types::{Subject, ViolationKind};

    use super::*;

    fn critical(path: &str) -> Violation {
        Violation::reactive(
            ViolationKind::FileSize,
            Severity::Critical,
            Subject::File(path.into()),
            4000.0,
            1500.0,
            0,
        )
    }

    #[test]
    fn healthy_state_has_no_triggers() {
        let samples = [SloSample::evaluate(SloMetric::ResponseTime, 120.0, 300.0, 0)];
        assert!(emergency_triggers(&EmergencyConfig::default(), &[], &samples, 0.95).is_empty());
    }

    #[test]
    fn slow_response_triggers_beyond_the_factor() {
        let config = EmergencyConfig::default();
        let at_limit = [SloSample::evaluate(SloMetric::ResponseTime, 600.0, 300.0, 0)];
        assert!(emergency_triggers(&config, &[], &at_limit, 1.0).is_empty());
        let beyond = [SloSample::evaluate(SloMetric::ResponseTime, 900.0, 300.0, 0)];
        let reasons = emergency_triggers(&config, &[], &beyond, 1.0);
        assert_eq!(reasons.len(), 1);
        assert!(reasons[0].starts_with("response time 900s"));
    }

    #[test]
    fn critical_count_and_health_floor() {
        let open: Vec<Violation> = (0..3).map(|i| critical(&format!("docs/{i}.md"))).collect();
        let reasons = emergency_triggers(&EmergencyConfig::default(), &open, &[], 0.5);
        assert_eq!(reasons.len(), 2);
        assert!(reasons[0].contains("3 open critical"));
        assert!(reasons[1].contains("below 0.70"));
    }
}
