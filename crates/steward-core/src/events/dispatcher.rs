//! EventDispatcher: synchronous fan-out to registered handlers.

use std::sync::Arc;

use super::handler::GovernanceEventHandler;
use super::types::*;

/// Synchronous event dispatcher wrapping a list of handlers.
///
/// Handlers that panic are caught and logged; the remaining handlers still
/// receive the event.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn GovernanceEventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn GovernanceEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Deliver `event` to every handler.
    pub fn emit(&self, event: &GovernanceEvent) {
        tracing::debug!(event = event.name(), "dispatching governance event");
        for handler in &self.handlers {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let h = handler.as_ref();
                h.on_any(event);
                route(h, event);
            }));
            if result.is_err() {
                tracing::error!(event = event.name(), "event handler panicked");
            }
        }
    }
}

fn route(h: &dyn GovernanceEventHandler, event: &GovernanceEvent) {
    match event {
        GovernanceEvent::ViolationOpened(e) => h.on_violation_opened(e),
        GovernanceEvent::ViolationClosed(e) => h.on_violation_closed(e),
        GovernanceEvent::ActionStarted(e) => h.on_action_started(e),
        GovernanceEvent::ActionCompleted(e) => h.on_action_completed(e),
        GovernanceEvent::ActionFailed(e) => h.on_action_failed(e),
        GovernanceEvent::ActionRolledBack(e) => h.on_action_rolled_back(e),
        GovernanceEvent::SloBreached(e) => h.on_slo_breached(e),
        GovernanceEvent::EmergencyEntered(e) => h.on_emergency_entered(e),
        GovernanceEvent::EmergencyCleared(e) => h.on_emergency_cleared(e),
        GovernanceEvent::ScanCompleted(e) => h.on_scan_completed(e),
        GovernanceEvent::Error(e) => h.on_error(e),
    }
}
