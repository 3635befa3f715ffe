//! Tests for the Steward event system.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use steward_core::events::{
    ActionStartedEvent, EmergencyEnteredEvent, EventDispatcher, GovernanceEvent,
    GovernanceEventHandler, ViolationOpenedEvent,
};
use steward_core::types::{ActionKind, Severity, Subject, Violation, ViolationKind};

#[derive(Default)]
struct CountingHandler {
    any: AtomicUsize,
    opened: AtomicUsize,
    started: AtomicUsize,
    emergencies: AtomicUsize,
    names: Mutex<Vec<&'static str>>,
}

impl GovernanceEventHandler for CountingHandler {
    fn on_any(&self, event: &GovernanceEvent) {
        self.any.fetch_add(1, Ordering::Relaxed);
        self.names.lock().unwrap().push(event.name());
    }

    fn on_violation_opened(&self, _event: &ViolationOpenedEvent) {
        self.opened.fetch_add(1, Ordering::Relaxed);
    }

    fn on_action_started(&self, _event: &ActionStartedEvent) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    fn on_emergency_entered(&self, _event: &EmergencyEnteredEvent) {
        self.emergencies.fetch_add(1, Ordering::Relaxed);
    }
}

struct PanickingHandler;

impl GovernanceEventHandler for PanickingHandler {
    fn on_any(&self, _event: &GovernanceEvent) {
        panic!("handler failure");
    }
}

fn opened() -> GovernanceEvent {
    GovernanceEvent::ViolationOpened(ViolationOpenedEvent {
        violation: Violation::reactive(
            ViolationKind::FileSize,
            Severity::High,
            Subject::File("docs/a.md".into()),
            2100.0,
            1500.0,
            10,
        ),
    })
}

#[test]
fn events_route_to_typed_hooks() {
    let handler = Arc::new(CountingHandler::default());
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(handler.clone());

    dispatcher.emit(&opened());
    dispatcher.emit(&GovernanceEvent::ActionStarted(ActionStartedEvent {
        action_id: "a-1".into(),
        kind: ActionKind::Modularize,
        subjects: vec!["docs/a.md".into()],
        started_at: 11,
    }));
    dispatcher.emit(&GovernanceEvent::EmergencyEntered(EmergencyEnteredEvent {
        reason: "test".into(),
        entered_at: 12,
    }));

    assert_eq!(handler.any.load(Ordering::Relaxed), 3);
    assert_eq!(handler.opened.load(Ordering::Relaxed), 1);
    assert_eq!(handler.started.load(Ordering::Relaxed), 1);
    assert_eq!(handler.emergencies.load(Ordering::Relaxed), 1);
    assert_eq!(
        *handler.names.lock().unwrap(),
        vec!["violation.opened", "action.started", "emergency.entered"]
    );
}

#[test]
fn panicking_handler_does_not_block_others() {
    let counter = Arc::new(CountingHandler::default());
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(Arc::new(PanickingHandler));
    dispatcher.register(counter.clone());
    assert_eq!(dispatcher.handler_count(), 2);

    dispatcher.emit(&opened());
    assert_eq!(counter.opened.load(Ordering::Relaxed), 1);
}

#[test]
fn events_serialize_with_wire_names() {
    let json = serde_json::to_string(&opened()).unwrap();
    assert!(json.contains("\"event\":\"violation.opened\""));
    let back: GovernanceEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(back.name(), "violation.opened");
}
