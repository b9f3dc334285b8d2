//! Batch dispatcher: bounded, cancellable, fail-fast extraction
//!
//! A [`JobDispatcher`] turns a list of [`JobSpec`]s into [`ExtractionTask`]s
//! that share one [`CancellationToken`] and one [`ProgressAggregator`], and
//! runs them on at most [`DispatcherConfig::capacity`] workers at a time.
//!
//! ```no_run
//! use std::sync::Arc;
//! use rdbarchive::archive::DirectoryArchive;
//! use rdbarchive::extract::{DispatcherConfig, ExecutionPriority, JobDispatcher, plan_all};
//!
//! let archive = Arc::new(DirectoryArchive::open("unpacked/")?);
//! let jobs = plan_all(archive.as_ref(), "out/".as_ref())?;
//!
//! let dispatcher = JobDispatcher::new(archive, DispatcherConfig::default())?;
//! dispatcher.configure(jobs, ExecutionPriority::Background)?;
//! let outcome = dispatcher.start()?;
//! println!("finished: {outcome}");
//! # Ok::<(), rdbarchive::Error>(())
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use super::cancel::CancellationToken;
use super::executor::{Executor, RayonExecutor};
use super::hint::{PriorityHint, ThreadPriorityHint};
use super::progress::ProgressAggregator;
use super::task::ExtractionTask;
use super::types::{
    BatchOutcome, ExecutionPriority, JobSpec, ProgressObserver, ProgressState, SharedPriority,
};
use crate::archive::Archive;
use crate::error::{Error, Result};

/// Default number of concurrent extractions.
///
/// Archive handles are not safe to extract from concurrently, so batches are
/// serialized unless the host opts into more workers.
pub const DEFAULT_CAPACITY: usize = 1;

/// Dispatcher settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Maximum number of tasks inside [`Archive::extract`] at once.
    pub capacity: usize,
}

impl DispatcherConfig {
    /// Config with the given capacity, clamped to at least one worker.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Counts workers that have been submitted but not yet finished.
#[derive(Debug, Default)]
struct Drain {
    active: Mutex<usize>,
    idle: Condvar,
}

impl Drain {
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a worker. The guard must travel with the submitted work.
    fn enter(self: &Arc<Self>) -> DrainGuard {
        *self.lock() += 1;
        DrainGuard(Arc::clone(self))
    }

    /// Block until every registered worker has dropped its guard.
    fn wait(&self) {
        let mut active = self.lock();
        while *active > 0 {
            active = self
                .idle
                .wait(active)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

struct DrainGuard(Arc<Drain>);

impl Drop for DrainGuard {
    fn drop(&mut self) {
        let mut active = self.0.lock();
        *active -= 1;
        if *active == 0 {
            self.0.idle.notify_all();
        }
    }
}

/// State of one started batch, shared between `start`, `cancel` and the
/// workers.
struct RunningBatch {
    token: CancellationToken,
    aggregator: Arc<ProgressAggregator>,
    pending: Mutex<VecDeque<ExtractionTask>>,
    drain: Arc<Drain>,
}

impl RunningBatch {
    fn next_task(&self) -> Option<ExtractionTask> {
        if self.token.is_cancelled() {
            return None;
        }
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Drop every task that has not started yet. Returns how many were
    /// removed.
    fn clear_pending(&self) -> usize {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let removed = pending.len();
        pending.clear();
        removed
    }

    fn work(&self) {
        while let Some(task) = self.next_task() {
            task.run();
        }
    }
}

enum Slot {
    Empty,
    /// `cancelled` latches a `cancel` that arrived before `start`.
    Configured {
        jobs: Vec<JobSpec>,
        cancelled: bool,
    },
    Running(Arc<RunningBatch>),
    Finished(ProgressState),
}

/// Owns the job list, the worker executor and the cancellation token of the
/// current batch.
///
/// All methods take `&self`: `start` blocks the calling thread while
/// `cancel`, `set_priority` and `current_progress` are called from another.
/// `cancel` must not be called from a worker thread or a progress observer,
/// since it waits for the workers to finish.
pub struct JobDispatcher {
    archive: Arc<dyn Archive>,
    config: DispatcherConfig,
    executor: Arc<dyn Executor>,
    hint: Arc<dyn PriorityHint>,
    observer: Option<ProgressObserver>,
    priority: SharedPriority,
    slot: Mutex<Slot>,
}

impl JobDispatcher {
    /// Create a dispatcher with its own rayon pool of `config.capacity`
    /// threads.
    pub fn new(archive: Arc<dyn Archive>, config: DispatcherConfig) -> Result<Self> {
        let executor = Arc::new(RayonExecutor::new(config.capacity)?);
        Ok(Self::with_executor(archive, config, executor))
    }

    /// Create a dispatcher that submits its workers to `executor`.
    #[must_use]
    pub fn with_executor(
        archive: Arc<dyn Archive>,
        config: DispatcherConfig,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            archive,
            config: DispatcherConfig::with_capacity(config.capacity),
            executor,
            hint: Arc::new(ThreadPriorityHint),
            observer: None,
            priority: SharedPriority::default(),
            slot: Mutex::new(Slot::Empty),
        }
    }

    /// Replace the priority hint applied by each task.
    #[must_use]
    pub fn with_hint(mut self, hint: Arc<dyn PriorityHint>) -> Self {
        self.hint = hint;
        self
    }

    /// Receive progress snapshots as jobs complete.
    #[must_use]
    pub fn with_observer(mut self, observer: ProgressObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    #[must_use]
    pub fn config(&self) -> DispatcherConfig {
        self.config
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn running(&self) -> Option<Arc<RunningBatch>> {
        match &*self.slot() {
            Slot::Running(batch) => Some(Arc::clone(batch)),
            _ => None,
        }
    }

    /// Store the next batch.
    ///
    /// Fails with [`Error::InvalidConfiguration`] while a batch is running
    /// and with [`Error::EntryOutOfRange`] if a job names an entry the
    /// archive does not have.
    pub fn configure(&self, jobs: Vec<JobSpec>, priority: ExecutionPriority) -> Result<()> {
        let count = self.archive.entry_count();
        if let Some(job) = jobs.iter().find(|job| job.entry.0 >= count) {
            return Err(Error::EntryOutOfRange {
                index: job.entry.0,
                count,
            });
        }

        let mut slot = self.slot();
        if matches!(*slot, Slot::Running(_)) {
            return Err(Error::InvalidConfiguration(
                "cannot configure while a batch is running".to_string(),
            ));
        }

        tracing::debug!("Configured batch of {} jobs ({priority})", jobs.len());
        self.priority.set(priority);
        *slot = Slot::Configured {
            jobs,
            cancelled: false,
        };
        Ok(())
    }

    /// Run the configured batch and block until it reaches a terminal
    /// outcome and every worker has finished.
    ///
    /// A batch cancelled before `start` returns [`BatchOutcome::Cancelled`]
    /// without running any task.
    pub fn start(&self) -> Result<BatchOutcome> {
        let batch = {
            let mut slot = self.slot();
            let jobs = match std::mem::replace(&mut *slot, Slot::Empty) {
                Slot::Configured {
                    jobs,
                    cancelled: true,
                } => {
                    let state = ProgressState {
                        total: jobs.len(),
                        completed: 0,
                        outcome: Some(BatchOutcome::Cancelled),
                    };
                    *slot = Slot::Finished(state);
                    tracing::info!(
                        "Batch cancelled before start: 0/{} jobs extracted",
                        state.total
                    );
                    return Ok(BatchOutcome::Cancelled);
                }
                Slot::Configured { jobs, .. } => jobs,
                Slot::Running(batch) => {
                    *slot = Slot::Running(batch);
                    return Err(Error::InvalidConfiguration(
                        "batch is already running".to_string(),
                    ));
                }
                previous @ (Slot::Empty | Slot::Finished(_)) => {
                    *slot = previous;
                    return Err(Error::InvalidConfiguration(
                        "no batch configured".to_string(),
                    ));
                }
            };

            let batch = Arc::new(self.build_batch(jobs));
            *slot = Slot::Running(Arc::clone(&batch));
            batch
        };

        let (_, total) = batch.aggregator.current_progress();
        if total == 0 {
            tracing::debug!("Empty batch, nothing to extract");
        } else {
            let workers = self.config.capacity.min(total);
            tracing::debug!("Dispatching {total} jobs on {workers} worker(s)");
            for _ in 0..workers {
                let guard = batch.drain.enter();
                let batch = Arc::clone(&batch);
                self.executor.execute(Box::new(move || {
                    let _guard = guard;
                    batch.work();
                }));
            }
        }

        let outcome = batch.aggregator.wait();
        if outcome == BatchOutcome::Failed {
            let dropped = batch.clear_pending();
            tracing::debug!("Dropped {dropped} pending jobs after failure");
        }
        batch.drain.wait();

        let state = batch.aggregator.snapshot();
        *self.slot() = Slot::Finished(state);

        tracing::info!(
            "Batch {outcome}: {}/{} jobs extracted",
            state.completed,
            state.total
        );
        Ok(outcome)
    }

    fn build_batch(&self, jobs: Vec<JobSpec>) -> RunningBatch {
        let token = CancellationToken::new();
        let aggregator = Arc::new(
            ProgressAggregator::new(jobs.len(), token.clone()).with_observer(self.observer.clone()),
        );

        let pending = jobs
            .into_iter()
            .enumerate()
            .map(|(index, job)| {
                ExtractionTask::new(
                    index,
                    job,
                    Arc::clone(&self.archive),
                    token.clone(),
                    self.priority.clone(),
                    Arc::clone(&self.hint),
                    Arc::clone(&aggregator),
                )
            })
            .collect();

        RunningBatch {
            token,
            aggregator,
            pending: Mutex::new(pending),
            drain: Arc::new(Drain::default()),
        }
    }

    /// Cancel the running batch.
    ///
    /// Sets the token, drops tasks that have not started, waits for running
    /// tasks to return, then finalizes the batch as
    /// [`BatchOutcome::Cancelled`] unless it already reached an outcome.
    ///
    /// On a configured batch that has not started, the request is kept and
    /// the next `start` returns `Cancelled` without touching the archive.
    /// Does nothing when no batch is configured or running.
    pub fn cancel(&self) {
        let batch = {
            let mut slot = self.slot();
            match &mut *slot {
                Slot::Running(batch) => Arc::clone(batch),
                Slot::Configured { cancelled, .. } => {
                    if !*cancelled {
                        tracing::debug!("Cancel requested before start");
                    }
                    *cancelled = true;
                    return;
                }
                Slot::Empty | Slot::Finished(_) => return,
            }
        };

        if batch.token.cancel() {
            tracing::debug!("Cancelling batch");
        }
        let dropped = batch.clear_pending();
        if dropped > 0 {
            tracing::debug!("Dropped {dropped} pending jobs");
        }

        batch.drain.wait();
        batch.aggregator.report_cancelled();
    }

    /// Update the priority hint for tasks that have not applied theirs yet.
    pub fn set_priority(&self, priority: ExecutionPriority) {
        self.priority.set(priority);
    }

    #[must_use]
    pub fn priority(&self) -> ExecutionPriority {
        self.priority.get()
    }

    /// `(completed, total)` of the current or most recent batch.
    #[must_use]
    pub fn current_progress(&self) -> (usize, usize) {
        match &*self.slot() {
            Slot::Empty => (0, 0),
            Slot::Configured { jobs, .. } => (0, jobs.len()),
            Slot::Running(batch) => batch.aggregator.current_progress(),
            Slot::Finished(state) => (state.completed, state.total),
        }
    }

    /// Full progress snapshot of the current or most recent batch.
    #[must_use]
    pub fn progress(&self) -> Option<ProgressState> {
        match &*self.slot() {
            Slot::Empty => None,
            Slot::Configured { jobs, .. } => Some(ProgressState {
                total: jobs.len(),
                completed: 0,
                outcome: None,
            }),
            Slot::Running(batch) => Some(batch.aggregator.snapshot()),
            Slot::Finished(state) => Some(*state),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(*self.slot(), Slot::Running(_))
    }

    /// Whether the running batch's token has been set, by `cancel` or by a
    /// failure.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.running().is_some_and(|batch| batch.token.is_cancelled())
    }
}

impl std::fmt::Debug for JobDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobDispatcher")
            .field("config", &self.config)
            .field("priority", &self.priority.get())
            .field("progress", &self.progress())
            .finish_non_exhaustive()
    }
}
