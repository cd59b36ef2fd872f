//! Honeydew Core
//!
//! Core types and abstractions shared by the Honeydew worker and the code
//! that feeds it work.
//!
//! This crate contains:
//! - Collaborator contracts: what a task and a task source must provide
//! - Cycle records: how the outcome of one busy/idle cycle is described

pub mod domain;

pub use domain::cycle::{Beat, CycleError, CycleReport};
pub use domain::task::{
    FnTask, FnTaskSource, NoTaskAvailable, Task, TaskSource, task_fn, task_source_fn,
};
