//! Worker
//!
//! Periodically checks whether it is free and, if so, asks its task source
//! for one task, executes it and goes idle again. A cycle that outlives the
//! worker's patience is abandoned: the worker goes idle and the task keeps
//! running in the background, unobserved.

use anyhow::anyhow;
use honeydew_core::{Beat, CycleError, CycleReport, TaskSource};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::{Instrument, debug, info, info_span};

use super::cycle::{CycleGuard, PendingLookup, run_task};
use super::stats::{WorkerState, WorkerStats};
use crate::config::{WorkerConfig, WorkerOptions};
use crate::error::{ConstructionError, Result};

/// Handle to a single-task polling worker
///
/// Cloning is cheap and every clone drives the same worker. The heartbeat
/// timer stops once the last handle is dropped.
#[derive(Clone)]
pub struct Worker {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    source: Arc<dyn TaskSource>,
    config: WorkerConfig,
    runtime: Handle,
    state: Mutex<State>,
    reports: watch::Sender<Option<CycleReport>>,
}

/// Everything the worker mutates, behind one lock
pub(crate) struct State {
    pub(crate) idle: bool,
    /// A task source call is outstanding, possibly from a timed-out cycle
    pub(crate) lookup_pending: bool,
    pub(crate) pulse: Option<JoinHandle<()>>,
    pub(crate) stats: WorkerStats,
}

/// Builder for [`Worker`]
#[derive(Default)]
pub struct WorkerBuilder {
    task_source: Option<Arc<dyn TaskSource>>,
    config: WorkerConfig,
}

impl WorkerBuilder {
    /// Sets the source the worker asks for tasks
    pub fn task_source(self, source: impl TaskSource + 'static) -> Self {
        self.shared_task_source(Arc::new(source))
    }

    /// Sets a task source that is shared with other owners
    pub fn shared_task_source(mut self, source: Arc<dyn TaskSource>) -> Self {
        self.task_source = Some(source);
        self
    }

    /// Replaces the whole configuration
    pub fn config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Applies the options that are set over the current configuration
    pub fn options(mut self, options: WorkerOptions) -> Self {
        self.config = self.config.merged(options);
        self
    }

    /// Sets the polling period
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval = interval;
        self
    }

    /// Sets the maximum duration of one cycle
    pub fn patience(mut self, patience: Duration) -> Self {
        self.config.patience = patience;
        self
    }

    /// Builds the worker and starts its heartbeat
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> Result<Worker> {
        let source = self
            .task_source
            .ok_or(ConstructionError::MissingTaskSource)?;
        self.config.validate()?;
        let runtime = Handle::try_current().map_err(|_| ConstructionError::NoRuntime)?;

        let (reports, _) = watch::channel(None);
        let worker = Worker {
            inner: Arc::new(Inner {
                source,
                config: self.config,
                runtime,
                state: Mutex::new(State {
                    idle: true,
                    lookup_pending: false,
                    pulse: None,
                    stats: WorkerStats::default(),
                }),
                reports,
            }),
        };

        info!(
            "Worker created (heartbeat interval: {:?}, patience: {:?})",
            self.config.heartbeat_interval, self.config.patience
        );

        worker.wake();
        Ok(worker)
    }
}

impl Worker {
    /// Creates a builder for a new worker
    pub fn builder() -> WorkerBuilder {
        WorkerBuilder::default()
    }

    /// Creates a worker with default configuration and starts it
    pub fn new(source: impl TaskSource + 'static) -> Result<Self> {
        Self::builder().task_source(source).build()
    }

    pub fn config(&self) -> WorkerConfig {
        self.inner.config
    }

    /// Starts the heartbeat timer if it is not already running
    pub fn wake(&self) {
        let mut state = self.inner.lock_state();
        if state.pulse.is_some() {
            debug!("Worker already awake");
            return;
        }

        let interval = self.inner.config.heartbeat_interval;
        let pulse = pulse(Arc::downgrade(&self.inner), interval);
        state.pulse = Some(self.inner.runtime.spawn(pulse));

        info!("Worker awake (heartbeat every {:?})", interval);
    }

    /// Stops the heartbeat timer
    ///
    /// A cycle already in flight is left to finish and still returns the
    /// worker to idle.
    pub fn sleep(&self) {
        let pulse = self.inner.lock_state().pulse.take();
        if let Some(handle) = pulse {
            handle.abort();
            info!("Worker asleep");
        }
    }

    /// Runs one heartbeat
    ///
    /// The idle check and the switch to busy happen when this is called,
    /// before the returned future is first polled, and patience is counted
    /// from that moment. If the worker was busy the future resolves to
    /// [`Beat::Skipped`] without touching the task source. Cycle failures
    /// are reported in the [`CycleReport`], never raised.
    pub fn heartbeat(&self) -> impl Future<Output = Beat> + Send + 'static {
        let guard = CycleGuard::begin(&self.inner);
        let inner = Arc::clone(&self.inner);
        let patience = self.inner.config.patience;

        async move {
            let Some(guard) = guard else {
                debug!("Worker busy, skipping heartbeat");
                return Beat::Skipped;
            };

            let span = info_span!("cycle", id = %guard.id);
            let deadline = guard.claimed_at + patience;
            let outcome = async move {
                debug!("Requesting task");
                let lookup = PendingLookup::claim(&inner);
                let source = Arc::clone(&inner.source);
                let work = inner
                    .runtime
                    .spawn(run_task(source, lookup).in_current_span());

                // Dropping the JoinHandle on timeout detaches the task
                match time::timeout_at(deadline, work).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(join_error)) => Err(CycleError::execution(anyhow!(
                        "task did not complete: {}",
                        join_error
                    ))),
                    Err(_) => {
                        debug!("Task still running after {:?}, going idle", patience);
                        Err(CycleError::Timeout { patience })
                    }
                }
            }
            .instrument(span)
            .await;

            Beat::Completed(guard.finish(outcome))
        }
    }

    /// Whether no cycle is in flight
    pub fn is_idle(&self) -> bool {
        self.inner.lock_state().idle
    }

    /// Whether the heartbeat timer is running
    pub fn is_awake(&self) -> bool {
        self.inner.lock_state().pulse.is_some()
    }

    pub fn state(&self) -> WorkerState {
        let state = self.inner.lock_state();
        match (state.pulse.is_some(), state.idle) {
            (false, _) => WorkerState::Asleep,
            (true, true) => WorkerState::AwakeIdle,
            (true, false) => WorkerState::AwakeBusy,
        }
    }

    pub fn stats(&self) -> WorkerStats {
        self.inner.lock_state().stats.clone()
    }

    /// Report of the most recently finished cycle
    pub fn last_cycle(&self) -> Option<CycleReport> {
        self.inner.reports.borrow().clone()
    }

    /// Subscribes to cycle reports as they are published
    pub fn subscribe(&self) -> watch::Receiver<Option<CycleReport>> {
        self.inner.reports.subscribe()
    }

    /// Whether two handles drive the same worker
    pub fn ptr_eq(&self, other: &Worker) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    #[cfg(test)]
    pub(crate) fn go_idle(&self) {
        self.inner.go_idle(None);
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("config", &self.inner.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Inner {
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the worker to idle, recording the report if there is one
    pub(crate) fn go_idle(&self, report: Option<&CycleReport>) {
        {
            let mut state = self.lock_state();
            state.idle = true;
            if let Some(report) = report {
                state.stats.record_cycle(report.error(), report.finished_at);
            }
        }

        if let Some(report) = report {
            self.reports.send_replace(Some(report.clone()));
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = state.pulse.take() {
            handle.abort();
        }
    }
}

/// The heartbeat timer
///
/// Fires every `interval`, first one interval after starting. Each fire
/// claims the worker synchronously and spawns the cycle so the timer never
/// waits on it.
async fn pulse(inner: Weak<Inner>, interval: Duration) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let Some(inner) = inner.upgrade() else {
            debug!("Worker dropped, stopping heartbeat");
            break;
        };

        let beat = Worker { inner }.heartbeat();
        tokio::spawn(beat);
    }
}
