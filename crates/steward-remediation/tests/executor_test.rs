//! Executor integration tests over a temporary corpus: scan, monitor, plan,
//! execute, rescan.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use steward_analysis::monitor::{self, cognitive_steps, reconcile, Producer, ThresholdMonitor};
use steward_analysis::patterns::clusters::{cluster_violation, find_clusters};
use steward_analysis::scanner::{CorpusScanner, ScanSnapshot};
use steward_core::errors::error_code;
use steward_core::events::{EventDispatcher, GovernanceEvent, GovernanceEventHandler};
use steward_core::traits::ManualClock;
use steward_core::types::{
    ActionKind, ActionPlan, ActionStatus, PlanStatus, Severity, Subject, Violation, ViolationKind,
};
use steward_core::{AllowedRoots, StewardConfig};
use steward_remediation::executor::SubjectLocks;
use steward_remediation::transforms::convert_format::normalize_document;
use steward_remediation::{ActionOutcome, Executor, PlanContext, RemediationPlanner};
use steward_storage::MetricStore;

#[derive(Default)]
struct Recorder {
    names: Mutex<Vec<&'static str>>,
}

impl GovernanceEventHandler for Recorder {
    fn on_any(&self, event: &GovernanceEvent) {
        self.names.lock().unwrap().push(event.name());
    }
}

struct Fixture {
    dir: tempfile::TempDir,
    config: StewardConfig,
    store: Arc<MetricStore>,
    clock: ManualClock,
    events: Arc<Recorder>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(StewardConfig::default())
    }

    fn with_config(config: StewardConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(
            dir.path().join("docs/README.md"),
            "# Home\n\nStart with the [guide](A.md).\n",
        )
        .unwrap();
        Self {
            dir,
            config,
            store: Arc::new(MetricStore::open_in_memory().unwrap()),
            clock: ManualClock::new(1_000),
            events: Arc::new(Recorder::default()),
        }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn write(&self, rel: &str, content: &str) {
        fs::write(self.path(rel), content).unwrap();
    }

    fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap()
    }

    fn roots(&self) -> AllowedRoots {
        AllowedRoots::new(self.dir.path(), &self.config.scan.effective_roots()).unwrap()
    }

    fn results(&self) -> PathBuf {
        self.path(".steward-results")
    }

    fn executor(&self) -> Executor {
        let mut events = EventDispatcher::new();
        events.register(self.events.clone());
        Executor::new(self.store.clone(), self.roots(), &self.config, &self.results())
            .with_clock(Arc::new(self.clock.clone()))
            .with_events(events)
    }

    fn scan(&self, now: i64) -> ScanSnapshot {
        let mut scanner = CorpusScanner::new(self.roots(), &self.config.scan).unwrap();
        let snap = scanner.scan_once(now).unwrap();
        self.store.put_file_metrics(&snap.metrics()).unwrap();
        snap
    }

    /// Scan, monitor, persist violations, and build a plan.
    fn plan(&self, now: i64) -> (ActionPlan, Vec<Violation>) {
        let snap = self.scan(now);
        let report = monitor::monitor_snapshot(
            &ThresholdMonitor::new(self.config.thresholds.clone()),
            &snap,
            0.15,
            0,
        );
        for v in &report.violations {
            self.store.put_violation(v).unwrap();
        }
        let plan = self.plan_for(&report.violations, &snap, &report.pairs, now);
        (plan, report.violations)
    }

    fn plan_for(
        &self,
        violations: &[Violation],
        snap: &ScanSnapshot,
        pairs: &[steward_analysis::SimilarityPair],
        now: i64,
    ) -> ActionPlan {
        let latest = snap.metrics();
        let ctx = PlanContext {
            latest: &latest,
            pairs,
            root_document: "docs/README.md",
        };
        let plan = RemediationPlanner::new(&self.config).plan(violations, &ctx, now);
        self.store.put_plan(&plan).unwrap();
        plan
    }

    fn events(&self) -> Vec<&'static str> {
        self.events.names.lock().unwrap().clone()
    }
}

/// `# Guide` plus `sections` level-2 sections of `lines` unique lines each.
fn sectioned(preamble: usize, sections: usize, lines: usize) -> String {
    let mut s = String::from("# Guide\n\n");
    for i in 0..preamble {
        s.push_str(&format!("pre{i} filler\n"));
    }
    s.push('\n');
    for sec in 1..=sections {
        s.push_str(&format!("## Part {sec}\n\n"));
        for i in 0..lines {
            s.push_str(&format!("s{sec}-l{i} detail\n"));
        }
    }
    s
}

fn files_matching(dir: &Path, prefix: &str) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with(prefix))
        .collect();
    names.sort();
    names
}

#[test]
fn modularize_closes_file_size_violation() {
    let fx = Fixture::new();
    fx.write("docs/A.md", &sectioned(1, 5, 420));
    let original_lines = fx.read("docs/A.md").lines().count();
    assert!(original_lines > 2_100);

    let (plan, violations) = fx.plan(1_000);
    assert_eq!(violations.len(), 1, "{violations:?}");
    assert_eq!(violations[0].kind, ViolationKind::FileSize);
    assert_eq!(plan.status, PlanStatus::Ready);
    assert_eq!(plan.actions.len(), 1);
    let action = &plan.actions[0];
    assert_eq!(action.kind, ActionKind::Modularize);

    fx.clock.set(1_010);
    let report = fx.executor().execute_plan(&plan).unwrap();
    let outcome = report.outcome(&action.id).unwrap();
    let ActionOutcome::Completed { post_metrics } = outcome else {
        panic!("unexpected outcome {outcome:?}");
    };
    assert_eq!(post_metrics.len(), 6);

    // Size reduction: under the limit, total output within 1.20x.
    let index = fx.read("docs/A.md");
    assert!(index.lines().count() <= 1_500);
    let siblings = files_matching(&fx.path("docs"), "A-");
    assert_eq!(
        siblings,
        vec!["A-01-part-1.md", "A-02-part-2.md", "A-03-part-3.md", "A-04-part-4.md", "A-05-part-5.md"]
    );
    let total: usize = index.lines().count()
        + siblings
            .iter()
            .map(|s| fx.read(&format!("docs/{s}")).lines().count())
            .sum::<usize>();
    assert!(total as f64 <= original_lines as f64 * 1.20);

    // Snapshot before mutation.
    let stored = fx.store.action(&action.id).unwrap().unwrap();
    assert_eq!(stored.status, ActionStatus::Completed);
    let backup = fx.store.backup(&action.id).unwrap().unwrap();
    assert!(backup.created_at <= stored.started_at.unwrap());
    assert!(Path::new(&backup.location).join("manifest.json").exists());
    assert!(fx.store.action_post_metrics(&action.id).unwrap().is_some());
    assert_eq!(fx.store.plan(&plan.id).unwrap().unwrap().status, PlanStatus::Dispatched);

    // The next cycle no longer reports the violation.
    let snap = fx.scan(1_300);
    let fresh = monitor::monitor_snapshot(
        &ThresholdMonitor::new(fx.config.thresholds.clone()),
        &snap,
        0.15,
        0,
    );
    let open = fx.store.open_violations().unwrap();
    let diff = reconcile(Producer::Monitor, &open, fresh.violations);
    assert_eq!(diff.closed, vec![violations[0].id.clone()]);

    assert_eq!(fx.events(), vec!["action.started", "action.completed"]);
}

#[test]
fn failed_validation_restores_original_bytes() {
    let fx = Fixture::new();
    // The preamble alone stays over the limit, so the split cannot pass.
    fx.write("docs/A.md", &sectioned(1_600, 5, 100));
    let original = fs::read(fx.path("docs/A.md")).unwrap();

    let (plan, _) = fx.plan(1_000);
    assert_eq!(plan.status, PlanStatus::Ready);
    let action = plan.actions[0].clone();

    let executor = fx.executor();
    let report = executor.execute_plan(&plan).unwrap();
    match report.outcome(&action.id).unwrap() {
        ActionOutcome::Failed { error_code, reason } => {
            assert_eq!(error_code, error_code::VALIDATION_FAILED);
            assert!(reason.contains("line_count_at_most"), "{reason}");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(fs::read(fx.path("docs/A.md")).unwrap(), original);
    assert!(files_matching(&fx.path("docs"), "A-").is_empty());

    let stored = fx.store.action(&action.id).unwrap().unwrap();
    assert_eq!(stored.status, ActionStatus::Failed);
    assert!(stored.diagnostics.unwrap().contains(error_code::VALIDATION_FAILED));
    assert_eq!(fx.events(), vec!["action.started", "action.failed"]);

    // A failed action can still be rolled back explicitly; nothing left to undo.
    executor.rollback(&action.id).unwrap();
    assert_eq!(fs::read(fx.path("docs/A.md")).unwrap(), original);
    assert_eq!(
        fx.store.action(&action.id).unwrap().unwrap().status,
        ActionStatus::RolledBack
    );
}

#[test]
fn rollback_of_completed_action_is_byte_identical() {
    let fx = Fixture::new();
    fx.write("docs/A.md", &sectioned(1, 5, 420));
    let original = fs::read(fx.path("docs/A.md")).unwrap();
    let (plan, _) = fx.plan(1_000);
    let executor = fx.executor();
    executor.execute_plan(&plan).unwrap();
    assert_eq!(files_matching(&fx.path("docs"), "A-").len(), 5);

    let rolled = executor.rollback_plan(&plan).unwrap();
    assert_eq!(rolled, plan.rollback_sequence);
    assert_eq!(fs::read(fx.path("docs/A.md")).unwrap(), original);
    assert!(files_matching(&fx.path("docs"), "A-").is_empty());
    assert!(fx.events().contains(&"action.rolled_back"));

    // RolledBack is terminal.
    assert!(executor.rollback(&plan.actions[0].id).is_err());
}

#[test]
fn debt_markers_strictly_decrease() {
    let mut config = StewardConfig::default();
    config.planner.auto_execute = Some(true);
    let fx = Fixture::with_config(config);
    let mut text = String::from("# Backlog\n\n");
    for i in 0..25 {
        text.push_str(&format!("TODO: item {i}\n"));
    }
    text.push_str("FIXME: broken table\n");
    fx.write("docs/backlog.md", &text);

    let (plan, violations) = fx.plan(1_000);
    assert!(violations.iter().any(|v| v.kind == ViolationKind::TechnicalDebt));
    let action = plan
        .actions
        .iter()
        .find(|a| a.kind == ActionKind::ResolveDebt)
        .unwrap();
    assert_eq!(action.subjects.to_vec(), vec!["docs/backlog.md".to_string()]);

    let report = fx.executor().execute_plan(&plan).unwrap();
    assert!(report.outcome(&action.id).unwrap().is_completed());
    let after = fx.read("docs/backlog.md");
    assert!(!after.contains("TODO"));
    assert_eq!(after.matches("**Action Item:**").count(), 25);
    assert_eq!(after.matches("**Improvement Needed:**").count(), 1);
}

fn near_duplicate(title: &str, prefix: &str) -> String {
    let mut s = format!("# {title}\n\n");
    for i in 0..6 {
        s.push_str(&format!("{prefix}{i} {prefix}x{i} {prefix}y{i}\n"));
    }
    s.push('\n');
    for i in 0..14 {
        s.push_str(&format!("shared{i} block{i} text{i}\n"));
    }
    s
}

#[test]
fn consolidation_moves_shared_blocks() {
    let fx = Fixture::new();
    fx.write("docs/alpha.md", &near_duplicate("Alpha", "al"));
    fx.write("docs/beta.md", &near_duplicate("Beta", "be"));

    let (plan, violations) = fx.plan(1_000);
    let dup = violations
        .iter()
        .find(|v| v.kind == ViolationKind::Duplication)
        .unwrap();
    assert_eq!(dup.subject, Subject::pair("docs/alpha.md", "docs/beta.md"));
    assert_eq!(plan.status, PlanStatus::Ready);
    let action = plan
        .actions
        .iter()
        .find(|a| a.kind == ActionKind::Consolidate)
        .unwrap();

    let report = fx.executor().execute_plan(&plan).unwrap();
    let outcome = report.outcome(&action.id).unwrap();
    assert!(outcome.is_completed(), "{outcome:?}");

    let shared = fx.read("docs/consolidated-alpha-beta.md");
    assert!(shared.starts_with("# Shared content of alpha and beta\n"));
    assert!(shared.contains("shared13 block13 text13"));
    for rel in ["docs/alpha.md", "docs/beta.md"] {
        let text = fx.read(rel);
        assert!(!text.contains("shared0"), "{rel}");
        assert!(text.contains("(consolidated-alpha-beta.md)"), "{rel}");
    }
    let score = steward_analysis::monitor::similarity(&fx.read("docs/alpha.md"), &fx.read("docs/beta.md"));
    assert!(score < 0.20, "{score}");
}

#[test]
fn cluster_consolidation_covers_every_member() {
    let mut config = StewardConfig::default();
    config.planner.auto_execute = Some(true);
    let fx = Fixture::with_config(config);
    fx.write("docs/alpha.md", &near_duplicate("Alpha", "al"));
    fx.write("docs/beta.md", &near_duplicate("Beta", "be"));
    fx.write("docs/gamma.md", &near_duplicate("Gamma", "ga"));
    let members = ["docs/alpha.md", "docs/beta.md", "docs/gamma.md"];

    let snap = fx.scan(1_000);
    let pairs = monitor::monitor_snapshot(
        &ThresholdMonitor::new(fx.config.thresholds.clone()),
        &snap,
        0.15,
        0,
    )
    .pairs;
    let clusters = find_clusters(&pairs, 0.5);
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].members, members.map(String::from).to_vec());
    let v = cluster_violation(&clusters[0], 0.5, 1_000);
    fx.store.put_violation(&v).unwrap();

    let plan = fx.plan_for(&[v], &snap, &pairs, 1_000);
    assert_eq!(plan.actions.len(), 1);
    let action = &plan.actions[0];
    assert_eq!(action.kind, ActionKind::Consolidate);
    assert_eq!(action.subjects.len(), 3);

    let report = fx.executor().execute_plan(&plan).unwrap();
    let outcome = report.outcome(&action.id).unwrap();
    assert!(outcome.is_completed(), "{outcome:?}");

    let consolidated = files_matching(&fx.path("docs"), "consolidated-");
    assert_eq!(consolidated.len(), 1, "{consolidated:?}");
    assert!(fx.read(&format!("docs/{}", consolidated[0])).contains("shared13 block13 text13"));
    for rel in members {
        let text = fx.read(rel);
        assert!(!text.contains("shared0"), "{rel}");
        assert!(text.contains(&format!("({})", consolidated[0])), "{rel}");
    }
    for (i, a) in members.iter().enumerate() {
        for b in &members[i + 1..] {
            let score = monitor::similarity(&fx.read(a), &fx.read(b));
            assert!(score < 0.20, "{a} ~ {b}: {score}");
        }
    }
}

#[test]
fn convert_format_is_idempotent() {
    let fx = Fixture::new();
    fx.write("docs/notes.md", "intro without a title\n### deep\n##### deeper\n");

    let (plan, violations) = fx.plan(1_000);
    assert!(violations.iter().any(|v| v.kind == ViolationKind::FormatCompliance));
    let action = plan
        .actions
        .iter()
        .find(|a| a.kind == ActionKind::ConvertFormat)
        .unwrap();
    assert_eq!(action.subjects.to_vec(), vec!["docs/notes.md".to_string()]);

    let report = fx.executor().execute_plan(&plan).unwrap();
    assert!(report.outcome(&action.id).unwrap().is_completed());
    let once = fx.read("docs/notes.md");
    assert!(once.starts_with("# Notes\n"));
    assert_eq!(normalize_document("docs/notes.md", &once), once);

    // Nothing left for the next cycle to convert.
    let (next, violations) = fx.plan(1_300);
    assert!(violations.is_empty(), "{violations:?}");
    assert_eq!(next.status, PlanStatus::Empty);
}

#[test]
fn busy_subject_defers_action() {
    let mut config = StewardConfig::default();
    config.executor.max_deferrals = Some(2);
    config.executor.defer_backoff_ms = Some(5);
    let fx = Fixture::with_config(config);
    fx.write("docs/A.md", &sectioned(1, 5, 420));
    let (plan, _) = fx.plan(1_000);
    let action_id = plan.actions[0].id.clone();

    let executor = fx.executor();
    let holder = SubjectLocks::new(&fx.results());
    let report = holder
        .with_locks(&plan.actions[0].subjects, &Default::default(), 1, || {
            executor.execute_plan(&plan).unwrap()
        })
        .unwrap();
    assert_eq!(report.outcome(&action_id), Some(&ActionOutcome::Deferred { attempts: 2 }));
    assert_eq!(
        fx.store.action(&action_id).unwrap().unwrap().status,
        ActionStatus::Pending
    );
    assert!(fx.store.backup(&action_id).unwrap().is_none());
}

#[test]
fn predicted_navigation_slowdown_is_optimized_and_validated() {
    let mut config = StewardConfig::default();
    config.planner.auto_execute = Some(true);
    let fx = Fixture::with_config(config);
    let mut readme = String::from("# Home\n\nWelcome.\n\n");
    for i in 1..=30 {
        readme.push_str(&format!("## Topic {i}\n\nSee [page {i}](page-{i}.md).\n\n"));
        if i == 1 {
            readme.push_str("##### Deep detail\n\nNested.\n\n");
        }
    }
    fx.write("docs/README.md", &readme);

    let snap = fx.scan(1_000);
    let before = cognitive_steps(snap.root_document.as_ref().unwrap());
    // 1 + 0.02·32 + 0.01·30 + 0.25·2: close to, but under, the 2.5 limit.
    assert!((before - 2.44).abs() < 1e-9, "{before}");

    let trend = Violation::predictive(
        ViolationKind::NavigationPerformance,
        Severity::Medium,
        Subject::System,
        before,
        2.5,
        0.8,
        Some(3.0 * 86_400.0),
        1_000,
    );
    let plan = fx.plan_for(&[trend], &snap, &[], 1_000);
    assert_eq!(plan.status, PlanStatus::Ready);
    assert_eq!(plan.actions.len(), 1, "{:?}", plan.actions);
    let action = &plan.actions[0];
    assert_eq!(action.kind, ActionKind::OptimizeStructure);
    assert_eq!(action.subjects.to_vec(), vec!["docs/README.md".to_string()]);

    let report = fx.executor().execute_plan(&plan).unwrap();
    let outcome = report.outcome(&action.id).unwrap();
    assert!(outcome.is_completed(), "{outcome:?}");

    let after_text = fx.read("docs/README.md");
    assert!(after_text.contains("[Topic 1](#topic-1)"));
    assert!(after_text.contains("\n### Deep detail\n"));
    let after = cognitive_steps(fx.scan(1_300).root_document.as_ref().unwrap());
    // Depth flattened, 12 navigation links added, quick navigation halves the excess.
    assert!((after - 1.53).abs() < 1e-9, "{after}");
    assert!(after < before);
}

#[test]
fn critical_violation_halts_the_rest_of_the_plan() {
    let fx = Fixture::new();
    fx.write("docs/A.md", &sectioned(1, 5, 420));
    let snap = fx.scan(1_000);
    let violations = vec![
        Violation::reactive(
            ViolationKind::FileSize,
            Severity::High,
            Subject::File("docs/A.md".into()),
            2_110.0,
            1_500.0,
            1_000,
        ),
        Violation::reactive(
            ViolationKind::NavigationPerformance,
            Severity::Critical,
            Subject::System,
            3.0,
            2.5,
            1_000,
        ),
    ];
    let plan = fx.plan_for(&violations, &snap, &[], 1_000);
    assert_eq!(plan.actions[0].kind, ActionKind::EmergencyHalt);
    assert_eq!(plan.actions[0].violation_id, violations[1].id);

    // The critical violation's own remediation waits behind the halt too.
    assert!(plan.actions.iter().any(|a| a.kind == ActionKind::OptimizeStructure));

    let executor = fx.executor();
    let report = executor.execute_plan(&plan).unwrap();
    assert!(report.outcome(&plan.actions[0].id).unwrap().is_completed());
    assert!(executor.latch().is_set());
    for action in &plan.actions[1..] {
        assert_eq!(report.outcome(&action.id), Some(&ActionOutcome::Halted));
        assert_eq!(
            fx.store.action(&action.id).unwrap().unwrap().status,
            ActionStatus::Pending
        );
    }
    assert_eq!(files_matching(&fx.path("docs"), "A-").len(), 0);
}

#[test]
fn plans_needing_approval_are_not_dispatched() {
    let fx = Fixture::new();
    // 1600 lines: barely over the limit, low confidence.
    fx.write("docs/A.md", &sectioned(1, 4, 398));
    let (plan, _) = fx.plan(1_000);
    assert_eq!(plan.status, PlanStatus::NeedsApproval);
    let err = fx.executor().execute_plan(&plan).unwrap_err();
    assert!(err.to_string().contains("cannot be dispatched"), "{err}");
    assert_eq!(fx.store.plan(&plan.id).unwrap().unwrap().status, PlanStatus::NeedsApproval);
}

#[test]
fn interrupted_action_is_restored_on_startup() {
    let fx = Fixture::new();
    fx.write("docs/A.md", &sectioned(1, 5, 420));
    let original = fs::read(fx.path("docs/A.md")).unwrap();
    let (plan, _) = fx.plan(1_000);
    let action = &plan.actions[0];

    // Simulate a crash mid-transform: backup taken, status Running, file half-written.
    let executor = fx.executor();
    let roots = fx.roots();
    let subjects = vec![("docs/A.md".to_string(), roots.resolve("docs/A.md").unwrap())];
    let snap = executor.backups().snapshot(&action.id, &subjects, 1_000).unwrap();
    fx.store.put_backup(&snap.record()).unwrap();
    fx.store
        .update_action_status(&action.id, ActionStatus::Running, 1_001, None, None)
        .unwrap();
    snap.created.record("docs/A-01-part-1.md").unwrap();
    fx.write("docs/A-01-part-1.md", "# Part 1\n");
    fx.write("docs/A.md", "truncated\n");
    drop(executor);

    let recovered = fx.executor().recover_interrupted().unwrap();
    assert_eq!(recovered, vec![action.id.clone()]);
    assert_eq!(fs::read(fx.path("docs/A.md")).unwrap(), original);
    assert!(!fx.path("docs/A-01-part-1.md").exists());
    let stored = fx.store.action(&action.id).unwrap().unwrap();
    assert_eq!(stored.status, ActionStatus::Failed);
    assert!(stored.diagnostics.unwrap().starts_with("[INTERRUPTED]"));
}

#[cfg(unix)]
#[test]
fn slow_converter_times_out_and_rolls_back() {
    let mut config = StewardConfig::default();
    config.executor.converter_command = vec![
        "sh".to_string(),
        "-c".to_string(),
        "printf 'partial\\n' > \"$0\"; sleep 5".to_string(),
    ];
    config.executor.per_action_timeout_s = Some(0.5);
    let fx = Fixture::with_config(config);
    let original = "intro without a title\n";
    fx.write("docs/notes.md", original);

    let (plan, _) = fx.plan(1_000);
    let action = plan
        .actions
        .iter()
        .find(|a| a.kind == ActionKind::ConvertFormat)
        .unwrap();
    let report = fx.executor().execute_plan(&plan).unwrap();
    match report.outcome(&action.id).unwrap() {
        ActionOutcome::Failed { error_code, .. } => assert_eq!(error_code, error_code::ACTION_TIMEOUT),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(fx.read("docs/notes.md"), original);
}

#[test]
fn oversized_alignment_is_cut_off_at_the_action_timeout() {
    let mut config = StewardConfig::default();
    config.executor.per_action_timeout_s = Some(0.001);
    let fx = Fixture::with_config(config);
    let big = |title: &str, own: &str| {
        let mut s = format!("# {title}\n\n{own} intro\n\n");
        for i in 0..3_990 {
            s.push_str(&format!("shared line {i} of the manual\n"));
        }
        s
    };
    fx.write("docs/alpha.md", &big("Alpha", "al"));
    fx.write("docs/beta.md", &big("Beta", "be"));
    let originals = [fx.read("docs/alpha.md"), fx.read("docs/beta.md")];

    let snap = fx.scan(1_000);
    let dup = Violation::reactive(
        ViolationKind::Duplication,
        Severity::Medium,
        Subject::pair("docs/alpha.md", "docs/beta.md"),
        0.95,
        0.20,
        1_000,
    );
    let plan = fx.plan_for(&[dup], &snap, &[], 1_000);
    assert_eq!(plan.status, PlanStatus::Ready);
    let action = &plan.actions[0];
    assert_eq!(action.kind, ActionKind::Consolidate);

    let started = Instant::now();
    let report = fx.executor().execute_plan(&plan).unwrap();
    let elapsed = started.elapsed();
    match report.outcome(&action.id).unwrap() {
        ActionOutcome::Failed { error_code, reason } => {
            assert_eq!(error_code, error_code::ACTION_TIMEOUT);
            assert!(reason.contains("exceeded 0.001s"), "{reason}");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(elapsed < Duration::from_secs(1), "{elapsed:?}");
    assert_eq!([fx.read("docs/alpha.md"), fx.read("docs/beta.md")], originals);
    assert!(!fx.path("docs/consolidated-alpha-beta.md").exists());
}

#[test]
fn backups_are_pruned_only_after_retention() {
    let fx = Fixture::new();
    fx.write("docs/A.md", &sectioned(1, 5, 420));
    let (plan, _) = fx.plan(1_000);
    let executor = fx.executor();
    executor.execute_plan(&plan).unwrap();
    let id = &plan.actions[0].id;
    let location = fx.store.backup(id).unwrap().unwrap().location;

    assert_eq!(executor.prune_backups().unwrap(), 0);
    fx.clock.set(1_000 + 31 * 86_400);
    assert_eq!(executor.prune_backups().unwrap(), 1);
    assert!(!Path::new(&location).exists());
    assert!(fx.store.backup(id).unwrap().unwrap().pruned_at.is_some());
}
