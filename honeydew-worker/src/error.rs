//! Error types for the worker
//!
//! Only construction can fail from the caller's point of view. Everything
//! that goes wrong during a cycle is recorded in its
//! [`CycleReport`](honeydew_core::CycleReport) instead.

use thiserror::Error;

/// Result type alias for worker construction
pub type Result<T> = std::result::Result<T, ConstructionError>;

/// Errors that can occur when building a worker
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    /// No task source was supplied
    #[error("Missing argument \"task_source\"")]
    MissingTaskSource,

    /// Configuration values are out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The worker starts its heartbeat timer immediately and needs a runtime to do so
    #[error("Worker must be built from within a Tokio runtime")]
    NoRuntime,
}
