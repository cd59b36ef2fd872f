//! Worker state and counters

use chrono::{DateTime, Utc};
use honeydew_core::CycleError;
use serde::{Deserialize, Serialize};

/// Externally visible state of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// The heartbeat timer is stopped; no new cycles start
    Asleep,

    /// Awake and free to pick up a task on the next heartbeat
    AwakeIdle,

    /// Awake with a cycle in flight
    AwakeBusy,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Asleep => write!(f, "Asleep"),
            WorkerState::AwakeIdle => write!(f, "AwakeIdle"),
            WorkerState::AwakeBusy => write!(f, "AwakeBusy"),
        }
    }
}

/// Running counters of heartbeats and cycle outcomes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    /// Heartbeats received, including skipped ones
    pub ticks: u64,

    /// Heartbeats dropped because a cycle was in flight
    pub skipped_ticks: u64,

    /// Cycles that ran to an outcome
    pub cycles: u64,

    pub succeeded: u64,

    /// Lookups where the source reported it had nothing to do
    pub empty_lookups: u64,

    /// Lookups that failed for any other reason
    pub lookup_failures: u64,

    pub execution_failures: u64,

    pub timeouts: u64,

    /// When the most recent cycle ended
    pub last_cycle_at: Option<DateTime<Utc>>,
}

impl WorkerStats {
    pub(crate) fn record_tick(&mut self, skipped: bool) {
        self.ticks += 1;
        if skipped {
            self.skipped_ticks += 1;
        }
    }

    pub(crate) fn record_cycle(&mut self, error: Option<&CycleError>, finished_at: DateTime<Utc>) {
        self.cycles += 1;
        self.last_cycle_at = Some(finished_at);

        match error {
            None => self.succeeded += 1,
            Some(e) if e.is_no_task() => self.empty_lookups += 1,
            Some(CycleError::Lookup(_)) => self.lookup_failures += 1,
            Some(CycleError::Execution(_)) => self.execution_failures += 1,
            Some(CycleError::Timeout { .. }) => self.timeouts += 1,
        }
    }
}
