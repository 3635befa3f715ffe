//! Anomaly detection with an isolation forest.
//!
//! Each file is a point in feature space (line, char, link, header, and debt
//! counts, max header depth). Points that random axis-aligned splits isolate
//! quickly are anomalous. The forest is grown from a fixed seed, so the same
//! input always yields the same scores.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use steward_core::types::{FileMetric, Severity, Subject, Violation, ViolationKind};

/// Score above which a point counts as anomalous.
pub const SCORE_THRESHOLD: f64 = 0.5;
/// Confidence attached to anomaly violations.
pub const ANOMALY_CONFIDENCE: f64 = 0.75;
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

pub const FEATURES: usize = 6;
pub type Features = [f64; FEATURES];

pub fn features(m: &FileMetric) -> Features {
    [
        f64::from(m.line_count),
        m.char_count as f64,
        f64::from(m.link_count),
        f64::from(m.header_count),
        f64::from(m.debt_marker_count),
        f64::from(m.max_header_depth),
    ]
}

#[derive(Debug, Clone, Copy)]
pub struct ForestParams {
    pub trees: usize,
    pub sample_size: usize,
    pub seed: u64,
}

enum Node {
    Split {
        feature: usize,
        value: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

/// Average path length of an unsuccessful BST search over `n` points.
fn c(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

fn build(data: &[Features], rows: &mut [usize], depth: usize, limit: usize, rng: &mut StdRng) -> Node {
    if depth >= limit || rows.len() <= 1 {
        return Node::Leaf { size: rows.len() };
    }
    // Features with spread among these rows.
    let mut candidates: Vec<(usize, f64, f64)> = Vec::with_capacity(FEATURES);
    for f in 0..FEATURES {
        let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for &r in rows.iter() {
            lo = lo.min(data[r][f]);
            hi = hi.max(data[r][f]);
        }
        if hi > lo {
            candidates.push((f, lo, hi));
        }
    }
    if candidates.is_empty() {
        return Node::Leaf { size: rows.len() };
    }
    let (feature, lo, hi) = candidates[rng.random_range(0..candidates.len())];
    let value = rng.random_range(lo..hi);

    let mut split = 0;
    for i in 0..rows.len() {
        if data[rows[i]][feature] < value {
            rows.swap(i, split);
            split += 1;
        }
    }
    let (left_rows, right_rows) = rows.split_at_mut(split);
    Node::Split {
        feature,
        value,
        left: Box::new(build(data, left_rows, depth + 1, limit, rng)),
        right: Box::new(build(data, right_rows, depth + 1, limit, rng)),
    }
}

fn path_length(node: &Node, x: &Features, depth: f64) -> f64 {
    match node {
        Node::Leaf { size } => depth + c(*size),
        Node::Split {
            feature,
            value,
            left,
            right,
        } => {
            if x[*feature] < *value {
                path_length(left, x, depth + 1.0)
            } else {
                path_length(right, x, depth + 1.0)
            }
        }
    }
}

/// Anomaly score of every point, `2^(−E[h(x)] / c(ψ))`, in input order.
pub fn isolation_scores(data: &[Features], params: ForestParams) -> Vec<f64> {
    let n = data.len();
    if n < 2 || params.trees == 0 {
        return vec![0.0; n];
    }
    let psi = params.sample_size.clamp(2, n);
    let limit = (psi as f64).log2().ceil() as usize;
    let mut rng = StdRng::seed_from_u64(params.seed);

    let trees: Vec<Node> = (0..params.trees)
        .map(|_| {
            let mut rows: Vec<usize> = rand::seq::index::sample(&mut rng, n, psi).into_vec();
            rows.sort_unstable();
            build(data, &mut rows, 0, limit, &mut rng)
        })
        .collect();

    let norm = c(psi);
    data.iter()
        .map(|x| {
            let mean = trees.iter().map(|t| path_length(t, x, 0.0)).sum::<f64>() / trees.len() as f64;
            2f64.powf(-mean / norm)
        })
        .collect()
}

/// A flagged file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyFinding {
    pub path: String,
    pub score: f64,
}

/// The `contamination` fraction of files with the highest scores, keeping
/// only scores above [`SCORE_THRESHOLD`]. Needs `min_files` non-empty files.
pub fn detect_anomalies(
    latest: &[&FileMetric],
    contamination: f64,
    min_files: usize,
    params: ForestParams,
) -> Vec<AnomalyFinding> {
    let mut files: Vec<&FileMetric> = latest.iter().copied().filter(|m| !m.is_empty()).collect();
    if files.len() < min_files.max(2) {
        return Vec::new();
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    let data: Vec<Features> = files.iter().map(|m| features(m)).collect();
    let scores = isolation_scores(&data, params);

    let budget = ((files.len() as f64) * contamination.clamp(0.0, 0.5)).ceil() as usize;
    let mut ranked: Vec<(usize, f64)> = scores.into_iter().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(budget)
        .filter(|(_, s)| *s > SCORE_THRESHOLD)
        .map(|(i, score)| AnomalyFinding {
            path: files[i].path.clone(),
            score,
        })
        .collect()
}

pub fn anomaly_violation(finding: &AnomalyFinding, now: i64) -> Violation {
    Violation::predictive(
        ViolationKind::Anomaly,
        Severity::Low,
        Subject::File(finding.path.clone()),
        finding.score,
        SCORE_THRESHOLD,
        ANOMALY_CONFIDENCE,
        None,
        now,
    )
    .with_message(format!("{} is structurally unusual (isolation score {:.2})", finding.path, finding.score))
}
