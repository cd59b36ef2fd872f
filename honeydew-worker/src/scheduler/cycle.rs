//! Cycle execution
//!
//! One cycle looks up a task, executes it, and races the whole thing
//! against the worker's patience. The lookup and execution run in their own
//! spawned task so that losing the race only detaches them.

use chrono::{DateTime, Utc};
use honeydew_core::{CycleError, CycleReport, TaskSource};
use std::sync::{Arc, Weak};
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use super::worker::Inner;

/// Marks the worker busy for the lifetime of one cycle
///
/// Finishing the guard records the outcome and goes idle. Dropping it
/// unfinished (the heartbeat future was dropped mid-cycle) still goes idle.
pub(crate) struct CycleGuard {
    inner: Arc<Inner>,
    pub(crate) id: Uuid,
    started_at: DateTime<Utc>,
    /// Patience is measured from here, not from the first poll
    pub(crate) claimed_at: Instant,
    finished: bool,
}

impl CycleGuard {
    /// Atomically checks the idle flag and claims the worker
    ///
    /// Returns `None` if a cycle is already in flight, or if a lookup from
    /// a timed-out cycle has not returned yet.
    pub(crate) fn begin(inner: &Arc<Inner>) -> Option<Self> {
        let mut state = inner.lock_state();
        let busy = !state.idle || state.lookup_pending;
        state.stats.record_tick(busy);

        if busy {
            if state.idle {
                debug!("Previous lookup still pending");
            }
            return None;
        }

        state.idle = false;
        Some(Self {
            inner: Arc::clone(inner),
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            claimed_at: Instant::now(),
            finished: false,
        })
    }

    /// Ends the cycle with the given outcome
    pub(crate) fn finish(mut self, outcome: Result<(), CycleError>) -> CycleReport {
        self.finished = true;

        match &outcome {
            Ok(()) => debug!("Cycle {} completed", self.id),
            Err(e) if e.is_no_task() => debug!("Cycle {}: no task available", self.id),
            Err(e) => warn!("Cycle {} failed: {}", self.id, e),
        }

        let report = CycleReport::finished(self.id, self.started_at, outcome);
        self.inner.go_idle(Some(&report));
        report
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        if !self.finished {
            debug!("Cycle {} abandoned before it settled", self.id);
            self.inner.go_idle(None);
        }
    }
}

/// Marks a task source call as outstanding until dropped
///
/// Outlives the cycle when the cycle times out during the lookup, so the
/// next heartbeat cannot call the source a second time.
pub(crate) struct PendingLookup {
    inner: Weak<Inner>,
}

impl PendingLookup {
    pub(crate) fn claim(inner: &Arc<Inner>) -> Self {
        inner.lock_state().lookup_pending = true;
        Self {
            inner: Arc::downgrade(inner),
        }
    }
}

impl Drop for PendingLookup {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.lock_state().lookup_pending = false;
        }
    }
}

/// The task path of a cycle: look up a task and execute it
pub(crate) async fn run_task(
    source: Arc<dyn TaskSource>,
    lookup: PendingLookup,
) -> Result<(), CycleError> {
    let task = source.find_task().await;
    drop(lookup);
    let task = task.map_err(CycleError::lookup)?;

    debug!("Task found, executing");

    task.execute().await.map_err(CycleError::execution)
}
