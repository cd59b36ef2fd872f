//! Cycle domain types
//!
//! A cycle spans from the moment the worker marks itself busy to the moment
//! it goes idle again. Its outcome is recorded, never raised.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::task::NoTaskAvailable;

/// Why a cycle ended without success
///
/// Collaborator errors are shared so that reports can be cloned out to
/// observers.
#[derive(Debug, Clone, Error)]
pub enum CycleError {
    /// The task source failed to produce a task
    #[error("task lookup failed: {0:#}")]
    Lookup(Arc<anyhow::Error>),

    /// The task failed while executing
    #[error("task execution failed: {0:#}")]
    Execution(Arc<anyhow::Error>),

    /// The cycle ran longer than the worker's patience
    #[error("timeout has occurred after {patience:?}")]
    Timeout {
        /// The patience that was exceeded
        patience: Duration,
    },
}

impl CycleError {
    /// Create a lookup error from a task source failure
    pub fn lookup(error: anyhow::Error) -> Self {
        Self::Lookup(Arc::new(error))
    }

    /// Create an execution error from a task failure
    pub fn execution(error: anyhow::Error) -> Self {
        Self::Execution(Arc::new(error))
    }

    /// Check if the cycle was cut short by the patience timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if the task source simply had nothing to hand out
    pub fn is_no_task(&self) -> bool {
        match self {
            Self::Lookup(e) => e.downcast_ref::<NoTaskAvailable>().is_some(),
            _ => false,
        }
    }
}

/// Record of one finished cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Unique identifier for the cycle
    pub id: Uuid,

    /// When the worker went busy
    pub started_at: DateTime<Utc>,

    /// When the worker went idle again
    pub finished_at: DateTime<Utc>,

    /// How the cycle ended
    pub outcome: Result<(), CycleError>,
}

impl CycleReport {
    /// Creates a report for a cycle finishing now
    pub fn finished(id: Uuid, started_at: DateTime<Utc>, outcome: Result<(), CycleError>) -> Self {
        Self {
            id,
            started_at,
            finished_at: Utc::now(),
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error(&self) -> Option<&CycleError> {
        self.outcome.as_ref().err()
    }

    /// Wall-clock time between going busy and going idle
    pub fn duration(&self) -> TimeDelta {
        self.finished_at - self.started_at
    }
}

/// Result of a single heartbeat
#[derive(Debug, Clone)]
pub enum Beat {
    /// The worker was busy; nothing happened
    Skipped,

    /// The worker was idle and ran a full cycle
    Completed(CycleReport),
}

impl Beat {
    /// The cycle report, if this beat ran a cycle
    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            Beat::Skipped => None,
            Beat::Completed(report) => Some(report),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Beat::Skipped)
    }
}
