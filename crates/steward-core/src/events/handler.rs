//! GovernanceEventHandler trait with no-op defaults.

use super::types::*;

/// Receives governance events. All methods default to no-ops so handlers
/// implement only what they consume. `on_any` sees every event before the
/// typed hook runs.
pub trait GovernanceEventHandler: Send + Sync {
    fn on_any(&self, _event: &GovernanceEvent) {}

    fn on_violation_opened(&self, _event: &ViolationOpenedEvent) {}
    fn on_violation_closed(&self, _event: &ViolationClosedEvent) {}

    fn on_action_started(&self, _event: &ActionStartedEvent) {}
    fn on_action_completed(&self, _event: &ActionCompletedEvent) {}
    fn on_action_failed(&self, _event: &ActionFailedEvent) {}
    fn on_action_rolled_back(&self, _event: &ActionRolledBackEvent) {}

    fn on_slo_breached(&self, _event: &SloBreachedEvent) {}

    fn on_emergency_entered(&self, _event: &EmergencyEnteredEvent) {}
    fn on_emergency_cleared(&self, _event: &EmergencyClearedEvent) {}

    fn on_scan_completed(&self, _event: &ScanCompletedEvent) {}
    fn on_error(&self, _event: &ErrorEvent) {}
}
