//! Scheduler layer for the worker
//!
//! This layer owns the heartbeat timer and the idle/busy state machine.
//! It decides when to ask for work and guarantees the worker always
//! returns to idle, whether the task succeeds, fails or times out.

mod cycle;
mod stats;
mod worker;

pub use stats::{WorkerState, WorkerStats};
pub use worker::{Worker, WorkerBuilder};
