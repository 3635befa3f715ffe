//! Bounded exponential backoff for transient failures.

use std::time::Duration;

use crate::errors::GovernanceError;

/// Retry policy: `max_retries` extra attempts, delay doubling from
/// `initial_backoff` and capped at `max_backoff`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Run `op`, retrying while it fails with a transient error.
/// Non-transient errors surface immediately.
pub fn with_backoff<T, F>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, GovernanceError>
where
    F: FnMut() -> Result<T, GovernanceError>,
{
    let mut attempt = 0;
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                let delay = policy.delay(attempt);
                tracing::warn!(what, attempt, delay_ms = delay.as_millis() as u64, error = %e, "transient failure, retrying");
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
