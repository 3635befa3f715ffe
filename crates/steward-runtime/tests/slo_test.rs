use std::sync::{Arc, Mutex};

use steward_core::config::SloConfig;
use steward_core::errors::StorageError;
use steward_core::events::{EventDispatcher, GovernanceEventHandler, SloBreachedEvent};
use steward_core::types::{Severity, SloMetric, SystemMetric};
use steward_runtime::SloTracker;
use steward_storage::MetricStore;

#[derive(Default)]
struct Breaches(Mutex<Vec<SloBreachedEvent>>);

impl GovernanceEventHandler for Breaches {
    fn on_slo_breached(&self, e: &SloBreachedEvent) {
        self.0.lock().unwrap().push(e.clone());
    }
}

fn system(at: i64, compliance: f64, steps: f64) -> SystemMetric {
    SystemMetric {
        sampled_at: at,
        file_count: 10,
        total_lines: 4_000,
        duplication_ratio: 0.0,
        cognitive_steps: steps,
        compliance_ratio: compliance,
        debt_marker_total: 0,
        scan_duration_ms: 12,
        skipped_files: 0,
        root_document_present: true,
        cycle_errors: 0,
    }
}

fn tracker() -> (Arc<MetricStore>, SloTracker, Arc<Breaches>) {
    let store = Arc::new(MetricStore::open_in_memory().unwrap());
    let breaches = Arc::new(Breaches::default());
    let mut events = EventDispatcher::new();
    events.register(breaches.clone());
    let slo = SloTracker::new(Arc::clone(&store), SloConfig::default()).with_events(events);
    (store, slo, breaches)
}

#[test]
fn samples_are_append_only_per_metric() {
    let (store, slo, _) = tracker();
    assert!(slo.sample(100).is_ok());
    assert!(matches!(slo.sample(100), Err(StorageError::OutOfOrder { .. })));
    assert!(matches!(slo.sample(50), Err(StorageError::OutOfOrder { .. })));
    assert!(slo.sample(101).is_ok());

    let samples = store.recent_samples(SloMetric::SystemReliability, 0).unwrap();
    let times: Vec<i64> = samples.iter().map(|s| s.sampled_at).collect();
    assert_eq!(times, vec![100, 101]);
}

#[test]
fn empty_window_is_compliant_and_skips_missing_kpis() {
    let (_, slo, breaches) = tracker();
    let samples = slo.sample(1_000).unwrap();
    let metrics: Vec<SloMetric> = samples.iter().map(|s| s.metric).collect();
    assert_eq!(metrics, vec![SloMetric::PreventionRate, SloMetric::SystemReliability]);
    assert!(samples.iter().all(|s| s.compliant && s.value == 1.0));
    assert!(breaches.0.lock().unwrap().is_empty());
}

#[test]
fn breached_kpis_are_published_with_graded_severity() {
    let (store, slo, breaches) = tracker();
    store.put_system_metric(&system(500, 0.6, 2.0)).unwrap();

    let samples = slo.sample(1_000).unwrap();
    let compliance = samples
        .iter()
        .find(|s| s.metric == SloMetric::ComplianceRatio)
        .unwrap();
    assert!(!compliance.compliant);
    assert!(samples
        .iter()
        .find(|s| s.metric == SloMetric::CognitiveSteps)
        .is_some_and(|s| s.compliant));

    let seen = breaches.0.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].sample.metric, SloMetric::ComplianceRatio);
    assert_eq!(seen[0].severity, Severity::Medium);
}

#[test]
fn measure_does_not_persist() {
    let (store, slo, _) = tracker();
    assert_eq!(slo.measure(100).unwrap().len(), 2);
    assert!(store.latest_slo_samples().unwrap().is_empty());
    assert!(slo.sample(100).is_ok());
}
