//! Honeydew Worker
//!
//! A single-task polling worker. On every heartbeat it checks whether it is
//! free; if so it asks its task source for one task, executes it, and goes
//! idle again, giving up on any cycle that outlasts its patience.
//!
//! Architecture:
//! - Configuration: timing parameters from defaults, options or environment
//! - Scheduler: the heartbeat timer and the idle/busy state machine
//! - Registry: construct-once access to a shared worker

pub mod config;
pub mod error;
pub mod registry;
pub mod scheduler;

pub use config::{WorkerConfig, WorkerOptions};
pub use error::{ConstructionError, Result};
pub use registry::WorkerRegistry;
pub use scheduler::{Worker, WorkerBuilder, WorkerState, WorkerStats};

pub use honeydew_core::{
    Beat, CycleError, CycleReport, NoTaskAvailable, Task, TaskSource, task_fn, task_source_fn,
};
