//! Pattern detector tests: growth forecasting, clusters, determinism.

use std::collections::BTreeMap;

use proptest::prelude::*;
use steward_analysis::monitor::SimilarityPair;
use steward_analysis::patterns::regression::fit;
use steward_analysis::patterns::{DetectorInput, PatternDetector};
use steward_core::config::{DetectorConfig, ThresholdConfig};
use steward_core::types::{FileMetric, Severity, Subject, SystemMetric, ViolationKind};

const SCAN_INTERVAL: i64 = 300;

fn metric(path: &str, at: i64, lines: u32, debt: u32) -> FileMetric {
    FileMetric {
        path: path.to_string(),
        sampled_at: at,
        line_count: lines,
        char_count: u64::from(lines) * 42,
        link_count: lines / 50,
        header_count: lines / 40,
        debt_marker_count: debt,
        max_header_depth: 2,
        format_issue_count: 0,
        has_title: true,
        content_hash: u64::from(lines),
    }
}

fn detector() -> PatternDetector {
    PatternDetector::new(DetectorConfig::default(), ThresholdConfig::default())
}

fn growth_input() -> DetectorInput {
    let t0 = 1_700_000_000;
    let mut samples = Vec::new();
    for (i, lines) in [800u32, 950, 1100, 1260].into_iter().enumerate() {
        samples.push(metric("docs/growing.md", t0 + i as i64 * SCAN_INTERVAL, lines, 0));
        samples.push(metric("docs/stable.md", t0 + i as i64 * SCAN_INTERVAL, 400, 0));
    }
    DetectorInput {
        now: t0 + 3 * SCAN_INTERVAL,
        file_history: DetectorInput::group_history(samples),
        ..Default::default()
    }
}

#[test]
fn growth_prediction_within_ten_scans() {
    let result = detector().detect(&growth_input());
    assert!(result.is_clean());
    let growth: Vec<_> = result
        .data
        .violations
        .iter()
        .filter(|v| v.kind == ViolationKind::GrowthTrend)
        .collect();
    assert_eq!(growth.len(), 1);
    let v = growth[0];
    assert_eq!(v.subject, Subject::File("docs/growing.md".into()));
    assert!(v.predictive);
    let ttb = v.time_to_breach.unwrap();
    assert!(ttb > 0.0 && ttb < 10.0 * SCAN_INTERVAL as f64, "ttb = {ttb}");
    assert!(v.confidence > 0.5 && v.confidence < 0.95, "confidence = {}", v.confidence);
    assert_eq!(v.severity, Severity::High);

    let pattern = result.data.growth.iter().find(|g| g.path == "docs/growing.md").unwrap();
    assert!(pattern.acceleration.is_some());
}

#[test]
fn detection_is_deterministic() {
    let mut input = growth_input();
    // Enough files for the anomaly forest, one of them far off.
    let mut extra = Vec::new();
    for i in 0..12 {
        extra.push(metric(&format!("docs/n{i:02}.md"), input.now, 200 + i * 7, i % 2));
    }
    extra.push(metric("docs/outlier.md", input.now, 9_000, 40));
    for m in extra {
        input.file_history.insert(m.path.clone(), vec![m]);
    }
    input.pairs = vec![SimilarityPair {
        a: "docs/n00.md".into(),
        b: "docs/n01.md".into(),
        score: 0.4,
    }];
    input.violation_counts = vec![
        (ViolationKind::FileSize, 10, 1),
        (ViolationKind::FileSize, 11, 2),
        (ViolationKind::FileSize, 12, 3),
        (ViolationKind::Duplication, 10, 1),
        (ViolationKind::Duplication, 11, 2),
        (ViolationKind::Duplication, 12, 3),
    ];

    let first = detector().detect(&input).data.violations;
    let second = detector().detect(&input).data.violations;
    assert_eq!(first, second);

    let kinds: Vec<ViolationKind> = first.iter().map(|v| v.kind).collect();
    assert!(kinds.contains(&ViolationKind::DuplicationCluster));
    assert!(kinds.contains(&ViolationKind::Anomaly));
    assert!(kinds.contains(&ViolationKind::Correlation));
    assert!(first.iter().all(|v| v.predictive));
    let anomaly = first.iter().find(|v| v.kind == ViolationKind::Anomaly).unwrap();
    assert_eq!(anomaly.subject, Subject::File("docs/outlier.md".into()));
    assert_eq!(anomaly.confidence, 0.75);
}

#[test]
fn debt_and_performance_trends() {
    let day = 86_400;
    let samples = vec![
        metric("docs/debt.md", 0, 100, 1),
        metric("docs/debt.md", day, 100, 3),
        metric("docs/debt.md", 2 * day, 100, 5),
    ];
    let system: Vec<SystemMetric> = (0..3)
        .map(|i| SystemMetric {
            sampled_at: i * day,
            cognitive_steps: 1.6 + 0.3 * i as f64,
            root_document_present: true,
            ..Default::default()
        })
        .collect();
    let input = DetectorInput {
        now: 2 * day,
        file_history: DetectorInput::group_history(samples),
        system_history: system,
        pairs: Vec::new(),
        violation_counts: Vec::new(),
    };
    let violations = detector().detect(&input).data.violations;
    assert!(violations
        .iter()
        .any(|v| v.kind == ViolationKind::TechnicalDebt && v.subject == Subject::File("docs/debt.md".into())));
    let perf = violations
        .iter()
        .find(|v| v.kind == ViolationKind::NavigationPerformance)
        .unwrap();
    assert_eq!(perf.subject, Subject::System);
    assert!(perf.time_to_breach.unwrap() > 0.0);
}

#[test]
fn empty_input_yields_nothing() {
    let input = DetectorInput {
        now: 0,
        file_history: BTreeMap::new(),
        ..Default::default()
    };
    let result = detector().detect(&input);
    assert!(result.is_clean());
    assert!(result.data.violations.is_empty());
}

proptest! {
    #[test]
    fn trend_slope_follows_the_direction_of_growth(
        start in 0.0f64..5_000.0,
        steps in proptest::collection::vec(1.0f64..200.0, 2..20),
        growing in any::<bool>(),
    ) {
        // A strictly monotone series, one sample per scan.
        let mut y = start;
        let mut points = vec![(0.0, y)];
        for (i, step) in steps.iter().enumerate() {
            y += if growing { *step } else { -*step };
            points.push(((i + 1) as f64, y));
        }
        let line = fit(&points).unwrap();
        prop_assert_eq!(line.slope > 0.0, growing);
        prop_assert!((0.0..=1.0).contains(&line.r_squared));
    }
}
