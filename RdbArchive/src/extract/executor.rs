//! Worker executors for batch extraction

use crate::error::{Error, Result};

/// A unit of work handed to an [`Executor`].
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Runs submitted work on background threads.
///
/// The dispatcher never submits more than its configured capacity of
/// concurrent workers, so an executor may be larger than the batch needs.
pub trait Executor: Send + Sync {
    fn execute(&self, work: Work);
}

/// Executor backed by a dedicated rayon thread pool.
#[derive(Debug)]
pub struct RayonExecutor {
    pool: rayon::ThreadPool,
}

impl RayonExecutor {
    /// Build a pool with `threads` named worker threads.
    pub fn new(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("rdb-extract-{i}"))
            .build()
            .map_err(|e| {
                Error::InvalidConfiguration(format!("failed to build worker pool: {e}"))
            })?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl Executor for RayonExecutor {
    fn execute(&self, work: Work) {
        self.pool.spawn(work);
    }
}
