//! Orchestrator tests over a temporary corpus with a manual clock.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use smallvec::smallvec;
use steward_core::traits::{ManualClock, NotificationSink};
use steward_core::types::{
    Action, ActionKind, ActionStatus, FileMetric, Severity, Subject, Violation, ViolationKind,
};
use steward_core::StewardConfig;
use steward_runtime::notify::MemorySink;
use steward_runtime::reports::DASHBOARD_FILE;
use steward_runtime::Orchestrator;

const T0: i64 = 1_700_000_000;

struct Fixture {
    dir: tempfile::TempDir,
    clock: ManualClock,
    alerts: Arc<MemorySink>,
    orch: Orchestrator,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(
            dir.path().join("docs/README.md"),
            "# Home\n\nStart with the [guide](A.md).\n",
        )
        .unwrap();
        let clock = ManualClock::new(T0);
        let alerts = Arc::new(MemorySink::new());
        let sinks: Vec<Arc<dyn NotificationSink>> = vec![alerts.clone()];
        let orch = Orchestrator::open_with(StewardConfig::default(), dir.path(), Arc::new(clock.clone()), sinks)
            .unwrap();
        Self {
            dir,
            clock,
            alerts,
            orch,
        }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn write(&self, rel: &str, content: &str) {
        fs::write(self.path(rel), content).unwrap();
    }

    fn event_names(&self) -> Vec<String> {
        self.orch
            .store()
            .events_since(0)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect()
    }
}

fn sectioned(sections: usize, lines: usize) -> String {
    let mut s = String::from("# Guide\n\nOverview.\n\n");
    for sec in 1..=sections {
        s.push_str(&format!("## Part {sec}\n\n"));
        for i in 0..lines {
            s.push_str(&format!("s{sec}-l{i} detail\n"));
        }
    }
    s
}

fn metric(path: &str, at: i64, lines: u32) -> FileMetric {
    FileMetric {
        path: path.to_string(),
        sampled_at: at,
        line_count: lines,
        char_count: u64::from(lines) * 40,
        link_count: 0,
        header_count: lines / 40,
        debt_marker_count: 0,
        max_header_depth: 2,
        format_issue_count: 0,
        has_title: true,
        content_hash: u64::from(lines),
    }
}

#[test]
fn once_remediates_oversized_file_and_writes_outputs() {
    let fx = Fixture::new();
    fx.write("docs/A.md", &sectioned(5, 420));

    let summary = fx.orch.run_once().unwrap();
    assert_eq!(summary.files, 2);
    assert_eq!(summary.opened, 1);
    assert_eq!(summary.plans, 1);
    assert_eq!(summary.executed.len(), 1);
    assert_eq!(summary.executed[0].count("completed"), 1);
    assert!(fx.path("docs/A-01-part-1.md").exists());
    assert!(summary.emergency.is_none());

    let dashboard: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(fx.orch.results_root().join(DASHBOARD_FILE)).unwrap()).unwrap();
    assert!(dashboard["health"]["overall"].as_f64().unwrap() > 0.0);
    assert_eq!(summary.reports.len(), 1);
    assert!(summary.reports[0].ends_with("reports/daily-2023-11-14.json"));

    let names = fx.event_names();
    for expected in ["violation.opened", "action.started", "action.completed", "scan.completed"] {
        assert!(names.iter().any(|n| n == expected), "missing {expected} in {names:?}");
    }

    // The next pass sees the split corpus and closes the size violation.
    fx.clock.advance(300);
    let summary = fx.orch.run_once().unwrap();
    assert_eq!(summary.closed, 1);
    assert!(summary.reports.is_empty());
    let open = fx.orch.store().open_violations().unwrap();
    assert!(!open.iter().any(|v| v.kind == ViolationKind::FileSize), "{open:?}");
}

#[test]
fn growth_trend_is_predicted_from_stored_history() {
    let fx = Fixture::new();
    for (i, lines) in [800u32, 950, 1100, 1260].into_iter().enumerate() {
        let at = T0 + i as i64 * 300;
        fx.orch
            .store()
            .put_file_metrics(&[metric("docs/growing.md", at, lines), metric("docs/stable.md", at, 400)])
            .unwrap();
    }

    let delta = fx.orch.detect_cycle(T0 + 900).unwrap();
    let growth: Vec<&Violation> = delta
        .opened
        .iter()
        .filter(|v| v.kind == ViolationKind::GrowthTrend)
        .collect();
    assert_eq!(growth.len(), 1);
    assert_eq!(growth[0].subject, Subject::File("docs/growing.md".into()));
    assert!(growth[0].predictive);
    assert!(growth[0].time_to_breach.unwrap() > 0.0);

    // Still forecast on the next pass: the open violation keeps its id.
    let again = fx.orch.detect_cycle(T0 + 960).unwrap();
    assert!(again.opened.is_empty());
    assert_eq!(again.closed, 0);
}

#[test]
fn slow_response_enters_emergency_and_holds_plans() {
    let fx = Fixture::new();
    let store = fx.orch.store();

    // A violation that took 900s to remediate against a 300s target.
    let old = Violation::reactive(
        ViolationKind::TechnicalDebt,
        Severity::Medium,
        Subject::File("docs/old.md".into()),
        30.0,
        20.0,
        T0 - 1_000,
    );
    store.put_violation(&old).unwrap();
    let done = Action {
        id: "act-old".to_string(),
        plan_id: "plan-old".to_string(),
        violation_id: old.id.clone(),
        kind: ActionKind::ResolveDebt,
        subjects: smallvec!["docs/old.md".to_string()],
        confidence: 0.9,
        estimated_duration_s: 10.0,
        prerequisites: Vec::new(),
        success_criteria: Vec::new(),
        status: ActionStatus::Completed,
        created_at: T0 - 1_000,
        started_at: Some(T0 - 950),
        finished_at: Some(T0 - 100),
        diagnostics: None,
    };
    store.put_action(&done).unwrap();

    let report = fx.orch.slo_cycle(T0).unwrap();
    assert!(report.triggers.iter().any(|t| t.starts_with("response time 900s")), "{:?}", report.triggers);
    assert!(fx.orch.in_emergency());

    let slo = fx.alerts.on_channel("slo");
    let rt = slo
        .iter()
        .find(|n| n.payload["metric"] == "response_time")
        .expect("response time alert");
    assert_eq!(rt.severity, Severity::Critical);
    assert_eq!(fx.alerts.on_channel("emergency").len(), 1);
    assert!(!fx.orch.enter_emergency("again"));
    assert_eq!(fx.alerts.on_channel("emergency").len(), 1);

    // New work is planned but not dispatched.
    fx.write("docs/A.md", &sectioned(5, 420));
    fx.clock.set(T0 + 60);
    let summary = fx.orch.run_once().unwrap();
    assert_eq!(summary.plans, 1);
    assert!(summary.executed.is_empty());
    assert!(!fx.path("docs/A-01-part-1.md").exists());

    assert!(fx.orch.clear_emergency());
    assert!(!fx.orch.in_emergency());
    fx.clock.set(T0 + 120);
    let summary = fx.orch.run_once().unwrap();
    assert_eq!(summary.executed.len(), 1);
    assert_eq!(summary.executed[0].count("completed"), 1);
    assert!(fx.path("docs/A-01-part-1.md").exists());

    let names = fx.event_names();
    assert!(names.iter().any(|n| n == "emergency.entered"));
    assert!(names.iter().any(|n| n == "emergency.cleared"));
}

#[test]
fn corrupt_subject_is_quarantined_until_its_content_changes() {
    let fx = Fixture::new();
    fx.write("docs/A.md", &sectioned(5, 420));
    let scan = fx.orch.scan_cycle(T0).unwrap();
    let plan = fx.orch.plan_cycle(scan.opened, T0).unwrap().unwrap();

    // The file turns to invalid UTF-8 between planning and execution.
    let mut bytes = vec![0xff, 0xfe];
    bytes.extend_from_slice(sectioned(5, 420).as_bytes());
    fs::write(fx.path("docs/A.md"), bytes).unwrap();

    let report = fx.orch.execute(&plan).unwrap();
    assert_eq!(report.count("failed"), 1);
    assert_eq!(fx.orch.quarantined(), vec!["docs/A.md".to_string()]);
    let anomaly = |open: &[Violation]| {
        open.iter()
            .any(|v| v.kind == ViolationKind::Anomaly && v.subject == Subject::File("docs/A.md".into()))
    };
    let open = fx.orch.store().open_violations().unwrap();
    assert!(anomaly(&open), "{open:?}");

    // No retry while quarantined, even once the replan interval has passed.
    assert!(fx.orch.plan_cycle(open, T0 + 700).unwrap().is_none());

    // Still unreadable: the anomaly stays open across scans.
    fx.orch.scan_cycle(T0 + 800).unwrap();
    assert!(anomaly(&fx.orch.store().open_violations().unwrap()));

    fx.write("docs/A.md", "# Guide\n\nRepaired.\n");
    let scan = fx.orch.scan_cycle(T0 + 900).unwrap();
    assert!(scan.closed >= 1);
    assert!(fx.orch.quarantined().is_empty());
    assert!(!anomaly(&fx.orch.store().open_violations().unwrap()));
}

#[test]
fn results_root_inside_corpus_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("docs")).unwrap();
    let mut config = StewardConfig::default();
    config.orchestrator.results_root = Some("docs/.results".to_string());
    let err = Orchestrator::open_with(config, dir.path(), Arc::new(ManualClock::new(T0)), Vec::new())
        .err()
        .unwrap();
    assert!(err.to_string().contains("orchestrator.results_root"), "{err}");
}
