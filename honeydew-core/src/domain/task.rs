//! Task and task source contracts
//!
//! A task source is asked for one unit of work at a time. The worker only
//! ever calls `find_task` again after the previous cycle has ended, but
//! sources must still be safe to call repeatedly.

use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;
use thiserror::Error;

/// A unit of work handed out by a [`TaskSource`]
#[async_trait]
pub trait Task: Send + Sync {
    /// Runs the task to completion
    async fn execute(&self) -> Result<()>;
}

/// Produces the next task for the worker
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Looks up the next task
    ///
    /// Return [`NoTaskAvailable`] when there is nothing to do; any other
    /// error is treated as a failed lookup. Either way the cycle ends and
    /// the worker goes idle.
    async fn find_task(&self) -> Result<Box<dyn Task>>;
}

/// Returned by a task source that currently has nothing to hand out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Error)]
#[error("no task available")]
pub struct NoTaskAvailable;

/// A [`Task`] backed by an async closure
pub struct FnTask<F> {
    f: F,
}

/// Wraps an async closure as a [`Task`]
pub fn task_fn<F, Fut>(f: F) -> FnTask<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    FnTask { f }
}

#[async_trait]
impl<F, Fut> Task for FnTask<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn execute(&self) -> Result<()> {
        (self.f)().await
    }
}

/// A [`TaskSource`] backed by an async closure
pub struct FnTaskSource<F> {
    f: F,
}

/// Wraps an async closure as a [`TaskSource`]
///
/// The closure may resolve to any concrete [`Task`]; it is boxed on the way
/// out.
pub fn task_source_fn<F, Fut, T>(f: F) -> FnTaskSource<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Task + 'static,
{
    FnTaskSource { f }
}

#[async_trait]
impl<F, Fut, T> TaskSource for FnTaskSource<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Task + 'static,
{
    async fn find_task(&self) -> Result<Box<dyn Task>> {
        let task = (self.f)().await?;
        Ok(Box::new(task))
    }
}
