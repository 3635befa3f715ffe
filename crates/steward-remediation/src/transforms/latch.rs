//! Process-wide emergency latch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Set by the EmergencyHalt transform and by the orchestrator's emergency
/// triggers. While set, the executor accepts no new actions. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct EmergencyLatch {
    inner: Arc<LatchState>,
}

#[derive(Debug, Default)]
struct LatchState {
    set: AtomicBool,
    reason: Mutex<Option<String>>,
}

impl EmergencyLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the latch. Returns true when it was not set before; the first
    /// reason wins.
    pub fn trip(&self, reason: impl Into<String>) -> bool {
        let mut slot = self.inner.reason.lock().unwrap_or_else(PoisonError::into_inner);
        let newly = !self.inner.set.swap(true, Ordering::SeqCst);
        if newly {
            *slot = Some(reason.into());
        }
        newly
    }

    pub fn is_set(&self) -> bool {
        self.inner.set.load(Ordering::SeqCst)
    }

    pub fn reason(&self) -> Option<String> {
        self.inner
            .reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// External clearance. Returns true when the latch was set.
    pub fn clear(&self) -> bool {
        let mut slot = self.inner.reason.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
        self.inner.set.swap(false, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_reason_wins_and_clear_resets() {
        let latch = EmergencyLatch::new();
        let shared = latch.clone();
        assert!(latch.trip("critical violations"));
        assert!(!shared.trip("second"));
        assert!(shared.is_set());
        assert_eq!(latch.reason().as_deref(), Some("critical violations"));
        assert!(shared.clear());
        assert!(!latch.is_set());
        assert!(latch.reason().is_none());
        assert!(!latch.clear());
    }
}
