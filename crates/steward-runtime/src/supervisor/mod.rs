//! Worker supervision: heartbeats, restarts within a budget, and shutdown.
//!
//! Each worker runs on a named OS thread. A worker whose thread has exited
//! (panic) or that has not beaten for `missed_beats` heartbeat intervals is
//! retired and replaced by a fresh generation. At most `max_restarts` restarts
//! are allowed inside `restart_window_s`; beyond that the worker stays down and
//! `check()` reports the exhausted budget so the orchestrator can escalate.
//! A hung thread cannot be killed, so a retired generation is detached and its
//! late results are ignored.

mod worker;

pub use worker::Worker;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use steward_core::config::SupervisionConfig;
use steward_core::errors::SupervisionError;
use steward_core::events::EventDispatcher;
use steward_core::traits::{Cancellable, CancellationToken, Clock};
use steward_core::types::{SubsystemHeartbeat, WorkerStatus};
use steward_storage::MetricStore;

use worker::{Liveness, WorkerThread};

/// Outcome of one supervision pass.
#[derive(Debug, Default)]
pub struct SupervisionReport {
    pub restarted: Vec<String>,
    /// Budgets that ran out during this pass.
    pub exhausted: Vec<SupervisionError>,
    /// `(worker, message)` of a Fatal error observed in a worker.
    pub fatal: Option<(String, String)>,
}

struct Slot {
    worker: Arc<dyn Worker>,
    live: Arc<Liveness>,
    retired: CancellationToken,
    handle: Option<JoinHandle<()>>,
    restarts: VecDeque<Instant>,
    restart_count: u32,
    started: Instant,
    exhausted: bool,
    /// Status and restart count last written to the store, and when.
    persisted: Option<(WorkerStatus, u32, Instant)>,
}

impl Slot {
    fn heartbeat(&self) -> SubsystemHeartbeat {
        let live = self.live.snapshot();
        SubsystemHeartbeat {
            worker: self.worker.name().to_string(),
            last_beat_at: live.last_beat_at,
            status: live.status,
            error_count: live.error_count,
            uptime_seconds: self.started.elapsed().as_secs_f64(),
            restart_count: self.restart_count,
        }
    }

    /// The heartbeat, if it changed state or the last write is `interval` old.
    fn due_beat(&mut self, interval: Duration) -> Option<SubsystemHeartbeat> {
        let beat = self.heartbeat();
        let due = match self.persisted {
            None => true,
            Some((status, restarts, at)) => {
                status != beat.status || restarts != beat.restart_count || at.elapsed() >= interval
            }
        };
        if !due {
            return None;
        }
        self.persisted = Some((beat.status, beat.restart_count, Instant::now()));
        Some(beat)
    }
}

pub struct Supervisor {
    heartbeat: Duration,
    config: SupervisionConfig,
    clock: Arc<dyn Clock>,
    store: Option<Arc<MetricStore>>,
    events: EventDispatcher,
    slots: Mutex<Vec<Slot>>,
}

impl Supervisor {
    pub fn new(heartbeat: Duration, config: SupervisionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            heartbeat,
            config,
            clock,
            store: None,
            events: EventDispatcher::new(),
            slots: Mutex::new(Vec::new()),
        }
    }

    /// Persist heartbeats from `check()` on a status change or restart, and
    /// otherwise once per heartbeat interval.
    pub fn with_store(mut self, store: Arc<MetricStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_events(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat
    }

    /// Start `worker` on its own thread. Workers start in call order.
    pub fn spawn(&self, worker: Arc<dyn Worker>) -> Result<(), SupervisionError> {
        let live = Arc::new(Liveness::new(self.clock.now()));
        let retired = CancellationToken::new();
        let handle = self.start_thread(&worker, &live, &retired)?;
        tracing::info!(worker = worker.name(), "worker spawned");
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Slot {
                worker,
                live,
                retired,
                handle: Some(handle),
                restarts: VecDeque::new(),
                restart_count: 0,
                started: Instant::now(),
                exhausted: false,
                persisted: None,
            });
        Ok(())
    }

    fn start_thread(
        &self,
        worker: &Arc<dyn Worker>,
        live: &Arc<Liveness>,
        retired: &CancellationToken,
    ) -> Result<JoinHandle<()>, SupervisionError> {
        WorkerThread {
            worker: Arc::clone(worker),
            live: Arc::clone(live),
            retired: retired.clone(),
            heartbeat: self.heartbeat,
            clock: Arc::clone(&self.clock),
            events: self.events.clone(),
        }
        .spawn()
    }

    /// Detect dead or stalled workers and restart them within budget.
    pub fn check(&self) -> SupervisionReport {
        let mut report = SupervisionReport::default();
        let window = Duration::from_secs(self.config.effective_restart_window_s());
        let max_restarts = self.config.effective_max_restarts();
        let missed = self.heartbeat * self.config.effective_missed_beats();

        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        for slot in slots.iter_mut() {
            let name = slot.worker.name();
            let live = slot.live.snapshot();
            if let Some(message) = live.fatal.clone() {
                report.fatal.get_or_insert((name.to_string(), message));
            }
            if slot.exhausted {
                continue;
            }

            let exited = slot.handle.as_ref().map_or(true, JoinHandle::is_finished);
            let stall_limit = slot.worker.stall_after().map_or(missed, |d| d.max(missed));
            let stalled = live.last_beat.elapsed() >= stall_limit;
            if !exited && !stalled {
                continue;
            }

            slot.live.set_status(WorkerStatus::Error);
            slot.retired.cancel();
            if exited {
                if let Some(handle) = slot.handle.take() {
                    let _ = handle.join();
                }
            } else {
                // Detached: the stalled generation finishes on its own.
                slot.handle = None;
            }

            while slot
                .restarts
                .front()
                .is_some_and(|t| t.elapsed() > window)
            {
                slot.restarts.pop_front();
            }
            if slot.restarts.len() as u32 >= max_restarts {
                slot.exhausted = true;
                let err = SupervisionError::RestartBudgetExhausted {
                    worker: name.to_string(),
                    max_restarts,
                    window_s: window.as_secs(),
                };
                tracing::error!(worker = name, error = %err, "restart budget exhausted");
                report.exhausted.push(err);
                continue;
            }

            tracing::warn!(worker = name, exited, stalled, "restarting worker");
            let live = Arc::new(Liveness::new(self.clock.now()));
            let retired = CancellationToken::new();
            match self.start_thread(&slot.worker, &live, &retired) {
                Ok(handle) => {
                    slot.live = live;
                    slot.retired = retired;
                    slot.handle = Some(handle);
                    slot.restarts.push_back(Instant::now());
                    slot.restart_count += 1;
                    slot.started = Instant::now();
                    report.restarted.push(name.to_string());
                }
                Err(e) => {
                    tracing::error!(worker = name, error = %e, "worker respawn failed");
                    slot.restarts.push_back(Instant::now());
                }
            }
        }
        let interval = self.heartbeat;
        let beats: Vec<SubsystemHeartbeat> = slots.iter_mut().filter_map(|s| s.due_beat(interval)).collect();
        drop(slots);
        self.persist(&beats);
        report
    }

    pub fn heartbeats(&self) -> Vec<SubsystemHeartbeat> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(Slot::heartbeat)
            .collect()
    }

    /// Stop every worker, waiting at most `deadline` for their threads.
    /// Workers still running at the deadline are abandoned.
    pub fn shutdown(&self, deadline: Duration) -> Result<(), SupervisionError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        for slot in slots.iter() {
            slot.live.set_status(WorkerStatus::Stopping);
            slot.retired.cancel();
        }

        let until = Instant::now() + deadline;
        loop {
            let pending = slots
                .iter()
                .filter(|s| s.handle.as_ref().is_some_and(|h| !h.is_finished()))
                .count();
            if pending == 0 || Instant::now() >= until {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        let mut abandoned = Vec::new();
        for slot in slots.iter_mut() {
            match slot.handle.take() {
                Some(handle) if !handle.is_finished() => {
                    abandoned.push(slot.worker.name().to_string());
                }
                Some(handle) => {
                    let _ = handle.join();
                    slot.live.set_status(WorkerStatus::Inactive);
                }
                None => slot.live.set_status(WorkerStatus::Inactive),
            }
        }
        let beats: Vec<SubsystemHeartbeat> = slots.iter_mut().filter_map(|s| s.due_beat(Duration::ZERO)).collect();
        drop(slots);
        self.persist(&beats);

        if abandoned.is_empty() {
            tracing::info!("all workers stopped");
            Ok(())
        } else {
            Err(SupervisionError::ShutdownDeadline {
                deadline_s: deadline.as_secs(),
                workers: abandoned,
            })
        }
    }

    fn persist(&self, beats: &[SubsystemHeartbeat]) {
        let Some(store) = &self.store else { return };
        for beat in beats {
            if let Err(e) = store.put_heartbeat(beat) {
                tracing::warn!(worker = %beat.worker, error = %e, "heartbeat not persisted");
            }
        }
    }
}
