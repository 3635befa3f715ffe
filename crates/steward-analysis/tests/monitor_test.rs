//! Threshold monitor and similarity calibration tests.

use proptest::prelude::*;
use steward_analysis::monitor::{self, similarity, ThresholdMonitor};
use steward_analysis::scanner::{self, RootDocumentProfile, ScanSnapshot, ScannedFile};
use steward_core::config::ThresholdConfig;
use steward_core::types::{Severity, Subject, ViolationKind};

fn file(path: &str, text: &str) -> ScannedFile {
    let (metric, content, _) = scanner::measure(path, text, 100);
    ScannedFile { metric, content }
}

fn snapshot(files: Vec<ScannedFile>, root: Option<RootDocumentProfile>) -> ScanSnapshot {
    let mut files = files;
    files.sort_by(|a, b| a.metric.path.cmp(&b.metric.path));
    ScanSnapshot {
        sampled_at: 100,
        files,
        skipped: Vec::new(),
        duration_ms: 3,
        root_document: root,
    }
}

fn root() -> Option<RootDocumentProfile> {
    Some(RootDocumentProfile {
        path: "docs/README.md".into(),
        header_count: 4,
        link_count: 6,
        max_header_depth: 2,
        quick_nav_present: false,
    })
}

fn long_doc(lines: usize) -> String {
    let mut s = String::from("# Long\n");
    for i in 0..lines - 1 {
        s.push_str(&format!("line {i} of the long document\n"));
    }
    s
}

const INSTALL: &str = "# Installation

Download the installer from the releases page.
Run the installer and follow the prompts.
Restart your shell to pick up the new path.

## Overview

The tool keeps your notes in sync across machines.
";

const BILLING: &str = "# Billing

Invoices are issued on the first day of each month.
Payment is due within thirty days of the invoice date.
Contact finance for refunds or disputes.

## Overview

Each account has a single billing owner.
";

fn seventy_percent_pair() -> (String, String) {
    let shared: Vec<String> = ["alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf"]
        .iter()
        .map(|w| format!("Shared step {w} uses component {w}{w}"))
        .collect();
    let build = |title: &str, own: [&str; 2]| {
        let mut lines = vec![title.to_string()];
        lines.extend(shared[..4].iter().cloned());
        lines.extend(own.iter().map(|s| s.to_string()));
        lines.extend(shared[4..].iter().cloned());
        lines.join("\n") + "\n"
    };
    (
        build("# Doc A", ["unique apple one", "unique apricot two"]),
        build("# Doc B", ["other banana one", "other blueberry two"]),
    )
}

#[test]
fn similarity_calibration() {
    let unrelated = similarity(INSTALL, BILLING);
    assert!(unrelated > 0.05 && unrelated < 0.20, "unrelated = {unrelated}");

    let (a, b) = seventy_percent_pair();
    let s = similarity(&a, &b);
    assert!((s - 0.7167).abs() < 0.01, "shared = {s}");
}

#[test]
fn file_size_and_duplication_fire_with_default_severities() {
    let (a, b) = seventy_percent_pair();
    let snap = snapshot(
        vec![
            file("docs/README.md", "# Home\n"),
            file("docs/long.md", &long_doc(2100)),
            file("docs/a.md", &a),
            file("docs/b.md", &b),
            file("docs/empty.md", ""),
        ],
        root(),
    );
    let monitor = ThresholdMonitor::new(ThresholdConfig::default());
    let report = monitor::monitor_snapshot(&monitor, &snap, 0.15, 0);

    let size: Vec<_> = report.violations.iter().filter(|v| v.kind == ViolationKind::FileSize).collect();
    assert_eq!(size.len(), 1);
    assert_eq!(size[0].subject, Subject::File("docs/long.md".into()));
    assert_eq!(size[0].severity, Severity::High);
    assert_eq!(size[0].confidence, 1.0);
    assert!(!size[0].predictive);

    let dup: Vec<_> = report.violations.iter().filter(|v| v.kind == ViolationKind::Duplication).collect();
    assert_eq!(dup.len(), 1);
    assert_eq!(dup[0].subject, Subject::pair("docs/a.md", "docs/b.md"));
    assert_eq!(dup[0].severity, Severity::Medium);

    // Two of four non-empty files are duplicated.
    assert!((report.system.duplication_ratio - 0.5).abs() < 1e-9);
    assert_eq!(report.system.file_count, 5);
    assert!(report.system.root_document_present);
}

#[test]
fn system_level_violations() {
    let mut debt = String::from("# Debt\n");
    for i in 0..20 {
        debt.push_str(&format!("TODO item {i}\n"));
    }
    let snap = snapshot(
        vec![file("docs/debt.md", &debt), file("docs/untitled.md", "no title\n")],
        None,
    );
    let monitor = ThresholdMonitor::new(ThresholdConfig::default());
    let report = monitor::monitor_snapshot(&monitor, &snap, 0.15, 2);
    let kinds: Vec<ViolationKind> = report.violations.iter().map(|v| v.kind).collect();

    assert!(kinds.contains(&ViolationKind::TechnicalDebt));
    assert!(kinds.contains(&ViolationKind::FormatCompliance));
    assert!(kinds.contains(&ViolationKind::SystemStale));
    assert!(!kinds.contains(&ViolationKind::NavigationPerformance));
    let stale = report.violations.iter().find(|v| v.kind == ViolationKind::SystemStale).unwrap();
    assert_eq!(stale.severity, Severity::Critical);
    assert_eq!(report.system.cycle_errors, 2);
    assert_eq!(report.system.debt_marker_total, 20);
}

#[test]
fn navigation_performance_is_critical() {
    let snap = snapshot(
        vec![file("docs/README.md", "# Home\n")],
        Some(RootDocumentProfile {
            path: "docs/README.md".into(),
            header_count: 60,
            link_count: 80,
            max_header_depth: 5,
            quick_nav_present: false,
        }),
    );
    let monitor = ThresholdMonitor::new(ThresholdConfig::default());
    let report = monitor::monitor_snapshot(&monitor, &snap, 0.15, 0);
    let nav = report
        .violations
        .iter()
        .find(|v| v.kind == ViolationKind::NavigationPerformance)
        .unwrap();
    assert_eq!(nav.severity, Severity::Critical);
    // 1 + 1.2 + 0.8 + 0.5
    assert!((nav.current_value - 3.5).abs() < 1e-9);
}

#[test]
fn empty_files_never_violate() {
    let snap = snapshot(
        vec![file("docs/README.md", "# Home\n"), file("docs/e1.md", ""), file("docs/e2.md", "")],
        root(),
    );
    let monitor = ThresholdMonitor::new(ThresholdConfig::default());
    let report = monitor::monitor_snapshot(&monitor, &snap, 0.0, 0);
    assert!(report.pairs.is_empty());
    assert!(report
        .violations
        .iter()
        .all(|v| v.kind != ViolationKind::FileSize && v.kind != ViolationKind::Duplication));
}

proptest! {
    #[test]
    fn similarity_is_symmetric_and_bounded(
        a in proptest::collection::vec("[a-d ]{0,12}", 0..12),
        b in proptest::collection::vec("[a-d ]{0,12}", 0..12),
    ) {
        let a = a.join("\n");
        let b = b.join("\n");
        let ab = similarity(&a, &b);
        let ba = similarity(&b, &a);
        prop_assert!((ab - ba).abs() < 1e-12);
        prop_assert!((0.0..=1.0).contains(&ab));
    }
}
