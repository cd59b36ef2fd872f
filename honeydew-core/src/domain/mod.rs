//! Core domain types
//!
//! The worker never inspects a task beyond asking it to execute, so the
//! domain is small: the collaborator traits and the record of a cycle.

pub mod cycle;
pub mod task;
