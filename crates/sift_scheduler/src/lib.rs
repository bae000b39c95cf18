//! Work distribution across a fixed pool of checker workers.
//!
//! The scheduler provides the one facility the environment stack needs from
//! a parallelism layer: map a batch of independent tasks over a worker pool
//! and collect their results. It is built once per checking session from the
//! project configuration and shared by reference.

#![warn(missing_docs)]

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use sift_config::ProjectConfig;

/// Errors that can occur while constructing a scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The underlying worker pool could not be built.
    #[error("failed to build worker pool: {0}")]
    Pool(String),
}

/// A fixed worker pool that runs batches of independent tasks.
///
/// Tasks must not share mutable state without synchronization; callers that
/// partition work (e.g. the update engine) are responsible for handing each
/// task a disjoint slice of state.
pub struct Scheduler {
    pool: ThreadPool,
}

impl Scheduler {
    /// Builds a scheduler with the worker count from `config.check.workers`.
    ///
    /// A missing worker count lets the pool size itself to the number of
    /// logical cores.
    pub fn from_config(config: &ProjectConfig) -> Result<Self, SchedulerError> {
        Self::new(config.check.workers)
    }

    /// Builds a scheduler with an explicit worker count, or the per-core
    /// default when `workers` is `None`.
    pub fn new(workers: Option<usize>) -> Result<Self, SchedulerError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.unwrap_or(0))
            .thread_name(|i| format!("sift-worker-{i}"))
            .build()
            .map_err(|e| SchedulerError::Pool(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Builds a single-worker scheduler.
    ///
    /// Useful in tests and when debugging invalidation order.
    pub fn sequential() -> Result<Self, SchedulerError> {
        Self::new(Some(1))
    }

    /// Returns the number of workers in the pool.
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `f` over every item of the batch on the worker pool and collects
    /// the results.
    ///
    /// Blocks until the whole batch has completed. Result order follows item
    /// order, though callers are expected to treat the output as an unordered
    /// collection.
    pub fn map<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        self.pool
            .install(|| items.into_par_iter().map(f).collect())
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("workers", &self.workers())
            .finish()
    }
}
