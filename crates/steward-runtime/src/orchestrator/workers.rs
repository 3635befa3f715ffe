//! Supervised workers, one per component.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use steward_core::errors::GovernanceError;
use steward_core::types::{ActionPlan, Violation};

use super::Orchestrator;
use crate::supervisor::Worker;

/// How long the planner and executor wait on their queues per tick.
const QUEUE_POLL: Duration = Duration::from_millis(500);
/// A plan may keep the executor busy this long before it counts as stalled.
const EXECUTOR_STALL: Duration = Duration::from_secs(3600);
const REPORT_CHECK: Duration = Duration::from_secs(60);

/// Every worker, in start order.
pub(super) fn all(orch: &Arc<Orchestrator>) -> Vec<Arc<dyn Worker>> {
    let o = || Arc::clone(orch);
    vec![
        Arc::new(StoreWorker(o())),
        Arc::new(ScannerWorker(o())),
        Arc::new(DetectorWorker(o())),
        Arc::new(PlannerWorker {
            orch: o(),
            last_sweep: Mutex::new(None),
        }),
        Arc::new(ExecutorWorker(o())),
        Arc::new(SloWorker(o())),
        Arc::new(ReporterWorker(o())),
    ]
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s.max(1))
}

impl Orchestrator {
    /// Blocks up to one heartbeat per violation; the rest wait for the backlog sweep.
    fn enqueue(&self, violations: Vec<Violation>) {
        let wait = self.supervisor.heartbeat_interval();
        for v in violations {
            if self.violation_tx.send_timeout(v, wait).is_err() {
                tracing::warn!("violation queue full; deferring to the backlog sweep");
                return;
            }
        }
    }

    fn submit(&self, plan: ActionPlan) {
        if let Err(e) = self.plan_tx.send_timeout(plan, self.supervisor.heartbeat_interval()) {
            let plan = e.into_inner();
            tracing::warn!(plan_id = %plan.id, "plan queue full; holding plan");
            self.held.lock().unwrap_or_else(PoisonError::into_inner).push(plan);
        }
    }
}

struct StoreWorker(Arc<Orchestrator>);

impl Worker for StoreWorker {
    fn name(&self) -> &'static str {
        "store"
    }

    fn interval(&self) -> Duration {
        self.0.supervisor.heartbeat_interval()
    }

    fn tick(&self) -> Result<(), GovernanceError> {
        Ok(self.0.store.probe()?)
    }
}

struct ScannerWorker(Arc<Orchestrator>);

impl Worker for ScannerWorker {
    fn name(&self) -> &'static str {
        "scanner"
    }

    fn interval(&self) -> Duration {
        secs(self.0.config.orchestrator.effective_scan_interval_s())
    }

    fn tick(&self) -> Result<(), GovernanceError> {
        let report = self.0.scan_cycle(self.0.clock.now())?;
        self.0.enqueue(report.opened);
        Ok(())
    }
}

struct DetectorWorker(Arc<Orchestrator>);

impl Worker for DetectorWorker {
    fn name(&self) -> &'static str {
        "detector"
    }

    fn interval(&self) -> Duration {
        secs(self.0.config.orchestrator.effective_pattern_interval_s())
    }

    fn tick(&self) -> Result<(), GovernanceError> {
        let delta = self.0.detect_cycle(self.0.clock.now())?;
        self.0.enqueue(delta.opened);
        Ok(())
    }
}

/// Plans violations as they arrive, and every scan interval sweeps the
/// store for open violations that never made it through the queue.
struct PlannerWorker {
    orch: Arc<Orchestrator>,
    last_sweep: Mutex<Option<Instant>>,
}

impl PlannerWorker {
    fn sweep_due(&self) -> bool {
        let every = secs(self.orch.config.orchestrator.effective_scan_interval_s());
        let mut last = self.last_sweep.lock().unwrap_or_else(PoisonError::into_inner);
        if last.is_some_and(|t| t.elapsed() < every) {
            return false;
        }
        *last = Some(Instant::now());
        true
    }
}

impl Worker for PlannerWorker {
    fn name(&self) -> &'static str {
        "planner"
    }

    fn interval(&self) -> Duration {
        Duration::ZERO
    }

    fn tick(&self) -> Result<(), GovernanceError> {
        let o = &self.orch;
        let mut batch = match o.violation_rx.recv_timeout(QUEUE_POLL) {
            Ok(v) => vec![v],
            Err(RecvTimeoutError::Timeout) => Vec::new(),
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        };
        batch.extend(o.violation_rx.try_iter());
        if self.sweep_due() {
            batch.extend(o.store.open_violations()?);
        }
        if let Some(plan) = o.plan_cycle(batch, o.clock.now())? {
            if let Some(plan) = o.dispatchable(plan) {
                o.submit(plan);
            }
        }
        Ok(())
    }
}

struct ExecutorWorker(Arc<Orchestrator>);

impl Worker for ExecutorWorker {
    fn name(&self) -> &'static str {
        "executor"
    }

    fn interval(&self) -> Duration {
        Duration::ZERO
    }

    fn stall_after(&self) -> Option<Duration> {
        Some(EXECUTOR_STALL)
    }

    fn tick(&self) -> Result<(), GovernanceError> {
        let o = &self.0;
        for plan in o.take_held() {
            o.execute(&plan)?;
        }
        let plan = match o.plan_rx.recv_timeout(QUEUE_POLL) {
            Ok(plan) => plan,
            Err(_) => return Ok(()),
        };
        if let Some(plan) = o.dispatchable(plan) {
            o.execute(&plan)?;
        }
        Ok(())
    }
}

struct SloWorker(Arc<Orchestrator>);

impl Worker for SloWorker {
    fn name(&self) -> &'static str {
        "slo"
    }

    fn interval(&self) -> Duration {
        secs(self.0.config.orchestrator.effective_slo_interval_s())
    }

    fn tick(&self) -> Result<(), GovernanceError> {
        self.0.slo_cycle(self.0.clock.now())?;
        Ok(())
    }
}

struct ReporterWorker(Arc<Orchestrator>);

impl Worker for ReporterWorker {
    fn name(&self) -> &'static str {
        "reporter"
    }

    fn interval(&self) -> Duration {
        REPORT_CHECK
    }

    fn tick(&self) -> Result<(), GovernanceError> {
        self.0.report_cycle(self.0.clock.now())?;
        Ok(())
    }
}
