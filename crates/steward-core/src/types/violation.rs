//! Violations: typed records of a metric outside (or about to leave) its threshold.

use std::fmt;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

/// Closed set of violation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    FileSize,
    Duplication,
    TechnicalDebt,
    NavigationPerformance,
    FormatCompliance,
    GrowthTrend,
    Anomaly,
    Correlation,
    DuplicationCluster,
    SystemStale,
}

impl ViolationKind {
    pub const ALL: [ViolationKind; 10] = [
        Self::FileSize,
        Self::Duplication,
        Self::TechnicalDebt,
        Self::NavigationPerformance,
        Self::FormatCompliance,
        Self::GrowthTrend,
        Self::Anomaly,
        Self::Correlation,
        Self::DuplicationCluster,
        Self::SystemStale,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::FileSize => "file_size",
            Self::Duplication => "duplication",
            Self::TechnicalDebt => "technical_debt",
            Self::NavigationPerformance => "navigation_performance",
            Self::FormatCompliance => "format_compliance",
            Self::GrowthTrend => "growth_trend",
            Self::Anomaly => "anomaly",
            Self::Correlation => "correlation",
            Self::DuplicationCluster => "duplication_cluster",
            Self::SystemStale => "system_stale",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == s)
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Severity, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == s)
    }

    /// Relative urgency used by health scoring.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Low => 0.05,
            Self::Medium => 0.1,
            Self::High => 0.2,
            Self::Critical => 0.4,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a violation is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Subject {
    File(String),
    /// Unordered pair; always stored with the lexically smaller path first.
    Pair(String, String),
    /// Sorted, deduplicated group of paths.
    Group(Vec<String>),
    System,
}

impl Subject {
    pub fn pair(a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            Self::Pair(a, b)
        } else {
            Self::Pair(b, a)
        }
    }

    pub fn group(paths: impl IntoIterator<Item = String>) -> Self {
        let mut paths: Vec<String> = paths.into_iter().collect();
        paths.sort();
        paths.dedup();
        Self::Group(paths)
    }

    pub fn paths(&self) -> Vec<&str> {
        match self {
            Self::File(p) => vec![p.as_str()],
            Self::Pair(a, b) => vec![a.as_str(), b.as_str()],
            Self::Group(ps) => ps.iter().map(String::as_str).collect(),
            Self::System => Vec::new(),
        }
    }

    /// Stable textual key, used for reconciliation and storage.
    pub fn key(&self) -> String {
        match self {
            Self::File(p) => format!("file:{p}"),
            Self::Pair(a, b) => format!("pair:{a}|{b}"),
            Self::Group(ps) => format!("group:{}", ps.join("|")),
            Self::System => "system".to_string(),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(p) => f.write_str(p),
            Self::Pair(a, b) => write!(f, "{a} <-> {b}"),
            Self::Group(ps) => write!(f, "[{}]", ps.join(", ")),
            Self::System => f.write_str("<system>"),
        }
    }
}

/// A reactive or predictive violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub id: String,
    pub detected_at: i64,
    pub kind: ViolationKind,
    pub severity: Severity,
    pub subject: Subject,
    pub current_value: f64,
    pub threshold_value: f64,
    pub predictive: bool,
    pub confidence: f64,
    /// Seconds until the threshold is expected to be crossed.
    pub time_to_breach: Option<f64>,
    pub message: String,
    pub closed_at: Option<i64>,
}

impl Violation {
    /// A reactive violation with full confidence.
    pub fn reactive(
        kind: ViolationKind,
        severity: Severity,
        subject: Subject,
        current_value: f64,
        threshold_value: f64,
        detected_at: i64,
    ) -> Self {
        let mut v = Self {
            id: String::new(),
            detected_at,
            kind,
            severity,
            subject,
            current_value,
            threshold_value,
            predictive: false,
            confidence: 1.0,
            time_to_breach: None,
            message: String::new(),
            closed_at: None,
        };
        v.id = v.derive_id();
        v
    }

    /// A predictive violation produced by a pattern detector.
    #[allow(clippy::too_many_arguments)]
    pub fn predictive(
        kind: ViolationKind,
        severity: Severity,
        subject: Subject,
        current_value: f64,
        threshold_value: f64,
        confidence: f64,
        time_to_breach: Option<f64>,
        detected_at: i64,
    ) -> Self {
        let mut v = Self::reactive(kind, severity, subject, current_value, threshold_value, detected_at);
        v.predictive = true;
        v.confidence = confidence.clamp(0.0, 1.0);
        v.time_to_breach = time_to_breach;
        v.id = v.derive_id();
        v
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Identity used to match a fresh detection against an open violation.
    pub fn key(&self) -> String {
        format!("{}|{}|{}", self.kind.name(), self.subject.key(), self.predictive)
    }

    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }

    fn derive_id(&self) -> String {
        let seed = format!("{}@{}", self.key(), self.detected_at);
        format!("v-{:016x}", xxh3_64(seed.as_bytes()))
    }
}
