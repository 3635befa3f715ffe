//! Persists every governance event to the store's event log.

use std::sync::Arc;

use steward_core::events::{GovernanceEvent, GovernanceEventHandler};
use steward_core::traits::Clock;
use steward_storage::MetricStore;

pub struct EventLogHandler {
    store: Arc<MetricStore>,
    clock: Arc<dyn Clock>,
}

impl EventLogHandler {
    pub fn new(store: Arc<MetricStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

impl GovernanceEventHandler for EventLogHandler {
    fn on_any(&self, event: &GovernanceEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(event = event.name(), error = %e, "event not serializable");
                return;
            }
        };
        if let Err(e) = self.store.put_event(self.clock.now(), event.name(), &payload) {
            tracing::warn!(event = event.name(), error = %e, "event log write failed");
        }
    }
}
