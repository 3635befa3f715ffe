//! Worker trait and the supervised thread loop.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use steward_core::errors::{ErrorClass, GovernanceError, StewardErrorCode, SupervisionError};
use steward_core::events::{ErrorEvent, EventDispatcher, GovernanceEvent};
use steward_core::traits::{Cancellable, CancellationToken, Clock};
use steward_core::types::WorkerStatus;

/// A periodic unit of work run on its own thread.
pub trait Worker: Send + Sync {
    fn name(&self) -> &'static str;

    /// Time between the end of one tick and the start of the next.
    fn interval(&self) -> Duration;

    fn tick(&self) -> Result<(), GovernanceError>;

    /// How long a single tick may legitimately run without heartbeats.
    /// `None` uses the supervisor's missed-beat threshold.
    fn stall_after(&self) -> Option<Duration> {
        None
    }
}

#[derive(Debug, Clone)]
pub(crate) struct LiveState {
    pub last_beat: Instant,
    pub last_beat_at: i64,
    pub status: WorkerStatus,
    pub error_count: u32,
    /// Message of the last error classified Fatal.
    pub fatal: Option<String>,
}

/// Shared between one worker thread generation and the supervisor.
#[derive(Debug)]
pub(crate) struct Liveness {
    state: Mutex<LiveState>,
}

impl Liveness {
    pub fn new(now: i64) -> Self {
        Self {
            state: Mutex::new(LiveState {
                last_beat: Instant::now(),
                last_beat_at: now,
                status: WorkerStatus::Starting,
                error_count: 0,
                fatal: None,
            }),
        }
    }

    pub fn snapshot(&self) -> LiveState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_status(&self, status: WorkerStatus) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).status = status;
    }

    fn beat(&self, now: i64, status: Option<WorkerStatus>) {
        let mut s = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        s.last_beat = Instant::now();
        s.last_beat_at = now;
        if let Some(status) = status {
            s.status = status;
        }
    }

    fn record_error(&self, now: i64, fatal: Option<String>) {
        let mut s = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        s.last_beat = Instant::now();
        s.last_beat_at = now;
        s.status = WorkerStatus::Error;
        s.error_count += 1;
        if fatal.is_some() {
            s.fatal = fatal;
        }
    }
}

pub(crate) struct WorkerThread {
    pub worker: Arc<dyn Worker>,
    pub live: Arc<Liveness>,
    /// Cancelled on shutdown or when this generation is replaced.
    pub retired: CancellationToken,
    pub heartbeat: Duration,
    pub clock: Arc<dyn Clock>,
    pub events: EventDispatcher,
}

impl WorkerThread {
    pub fn spawn(self) -> Result<thread::JoinHandle<()>, SupervisionError> {
        let name = self.worker.name();
        thread::Builder::new()
            .name(format!("steward-{name}"))
            .spawn(move || self.run())
            .map_err(|e| SupervisionError::SpawnFailed {
                worker: name.to_string(),
                message: e.to_string(),
            })
    }

    fn run(self) {
        let name = self.worker.name();
        let step = (self.heartbeat / 4).clamp(Duration::from_millis(5), Duration::from_millis(250));
        let mut next_tick = Instant::now();
        self.live.beat(self.clock.now(), Some(WorkerStatus::Active));
        tracing::debug!(worker = name, "worker started");

        while !self.retired.is_cancelled() {
            if Instant::now() >= next_tick {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.worker.tick()));
                if self.retired.is_cancelled() {
                    break;
                }
                match outcome {
                    Ok(Ok(())) => self.live.beat(self.clock.now(), Some(WorkerStatus::Active)),
                    Ok(Err(e)) => self.report_error(&e),
                    Err(payload) => {
                        let err = SupervisionError::WorkerPanicked {
                            worker: name.to_string(),
                            message: panic_message(payload.as_ref()),
                        };
                        tracing::error!(worker = name, error = %err, "worker panicked");
                        self.live.record_error(self.clock.now(), None);
                        self.emit_error(err.error_code(), err.to_string(), false);
                        return;
                    }
                }
                next_tick = Instant::now() + self.worker.interval();
            } else {
                self.live.beat(self.clock.now(), None);
            }
            let remaining = next_tick.saturating_duration_since(Instant::now());
            thread::sleep(remaining.min(step));
        }
        tracing::debug!(worker = name, "worker stopped");
    }

    fn report_error(&self, e: &GovernanceError) {
        let name = self.worker.name();
        let fatal = e.class() == ErrorClass::Fatal;
        if fatal {
            tracing::error!(worker = name, error = %e.coded_string(), "fatal worker error");
        } else {
            tracing::warn!(worker = name, error = %e.coded_string(), "worker tick failed");
        }
        self.live
            .record_error(self.clock.now(), fatal.then(|| e.to_string()));
        self.emit_error(e.error_code(), e.to_string(), fatal);
    }

    fn emit_error(&self, code: &str, message: String, fatal: bool) {
        self.events.emit(&GovernanceEvent::Error(ErrorEvent {
            worker: self.worker.name().to_string(),
            error_code: code.to_string(),
            message,
            fatal,
        }));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
