//! Shared worker registry
//!
//! Gives an application one worker that every part of it can reach. The
//! registry is an ordinary value owned by whoever wires the application
//! together, so tests can hold as many independent registries as they like.

use honeydew_core::TaskSource;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::config::WorkerOptions;
use crate::error::Result;
use crate::scheduler::Worker;

/// Constructs a worker once and hands out that same worker afterwards
#[derive(Default)]
pub struct WorkerRegistry {
    instance: Mutex<Option<Worker>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared worker, building it on the first call
    ///
    /// The first successful call's arguments construct the worker; the
    /// arguments of every later call are ignored. A failed construction
    /// leaves the registry empty so a later call can try again.
    pub fn get_instance(
        &self,
        task_source: Option<Arc<dyn TaskSource>>,
        options: WorkerOptions,
    ) -> Result<Worker> {
        let mut instance = self.instance.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(worker) = instance.as_ref() {
            debug!("Reusing shared worker");
            return Ok(worker.clone());
        }

        let mut builder = Worker::builder().options(options);
        if let Some(source) = task_source {
            builder = builder.shared_task_source(source);
        }

        let worker = builder.build()?;
        *instance = Some(worker.clone());
        Ok(worker)
    }

    /// The shared worker, if it has been built
    pub fn get(&self) -> Option<Worker> {
        self.instance
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
