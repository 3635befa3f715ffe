//! Violation lifecycle across cycles.
//!
//! Each producer owns a slice of the open violations: the threshold monitor
//! owns every reactive violation, the pattern detector every predictive one.
//! A fresh cycle opens what is new and closes what its producer no longer
//! reports. Matching is by `Violation::key`, so an open violation keeps its
//! original id and `detected_at` while it persists.

use steward_core::types::collections::FxHashSet;
use steward_core::types::Violation;

/// Which component produced a batch of violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Producer {
    Monitor,
    Detector,
}

impl Producer {
    pub fn owns(&self, violation: &Violation) -> bool {
        match self {
            Self::Monitor => !violation.predictive,
            Self::Detector => violation.predictive,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Fresh violations with no open counterpart.
    pub opened: Vec<Violation>,
    /// Ids of open violations the producer no longer reports.
    pub closed: Vec<String>,
    /// Open violations confirmed by this cycle.
    pub persisting: Vec<Violation>,
}

/// Diff a producer's fresh batch against the currently open violations.
pub fn reconcile(producer: Producer, open: &[Violation], fresh: Vec<Violation>) -> Reconciliation {
    let fresh_keys: FxHashSet<String> = fresh.iter().map(Violation::key).collect();
    let owned: Vec<&Violation> = open.iter().filter(|v| producer.owns(v)).collect();
    let open_keys: FxHashSet<String> = owned.iter().map(|v| v.key()).collect();

    let mut result = Reconciliation::default();
    for v in owned {
        if fresh_keys.contains(&v.key()) {
            result.persisting.push(v.clone());
        } else {
            result.closed.push(v.id.clone());
        }
    }
    let mut seen = FxHashSet::default();
    for v in fresh {
        let key = v.key();
        if !open_keys.contains(&key) && seen.insert(key) {
            result.opened.push(v);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use steward_core::types::{Severity, Subject, ViolationKind};

    fn size(path: &str, at: i64) -> Violation {
        Violation::reactive(
            ViolationKind::FileSize,
            Severity::High,
            Subject::File(path.into()),
            2000.0,
            1500.0,
            at,
        )
    }

    #[test]
    fn opens_new_closes_missing_keeps_persisting() {
        let open = vec![size("docs/a.md", 10), size("docs/b.md", 10)];
        let fresh = vec![size("docs/b.md", 20), size("docs/c.md", 20)];
        let r = reconcile(Producer::Monitor, &open, fresh);
        assert_eq!(r.opened.len(), 1);
        assert_eq!(r.opened[0].subject, Subject::File("docs/c.md".into()));
        assert_eq!(r.closed, vec![open[0].id.clone()]);
        assert_eq!(r.persisting[0].id, open[1].id);
    }

    #[test]
    fn producers_do_not_close_each_other() {
        let predictive = Violation::predictive(
            ViolationKind::GrowthTrend,
            Severity::Medium,
            Subject::File("docs/a.md".into()),
            1200.0,
            1500.0,
            0.8,
            Some(600.0),
            10,
        );
        let r = reconcile(Producer::Monitor, &[predictive], Vec::new());
        assert!(r.closed.is_empty());
    }
}
