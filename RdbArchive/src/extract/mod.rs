//! Batch extraction scheduler
//!
//! Extracts a list of archive entries to disk on a bounded pool of workers,
//! with cooperative cancellation and fail-fast error handling.
//!
//! - [`JobDispatcher`] - configures, starts, and cancels a batch
//! - [`ExtractionTask`] - one job, with three cancellation checkpoints
//! - [`ProgressAggregator`] - counts completions, assigns the terminal outcome once
//! - [`CancellationToken`] - the shared cancel flag
//!
//! A batch ends in exactly one [`BatchOutcome`]: `Success` when every job
//! completed, `Failed` on the first extraction error (all remaining work is
//! cancelled), or `Cancelled` when the caller cancelled first.

mod cancel;
mod dispatcher;
mod executor;
mod hint;
mod plan;
mod progress;
mod task;
mod types;

pub use cancel::CancellationToken;
pub use dispatcher::{DEFAULT_CAPACITY, DispatcherConfig, JobDispatcher};
pub use executor::{Executor, RayonExecutor, Work};
pub use hint::{PriorityHint, ThreadPriorityHint};
pub use plan::{destination_for, plan_all, plan_selection, prepare_destinations};
pub use progress::ProgressAggregator;
pub use task::{ExtractionTask, TaskStatus};
pub use types::{
    BatchOutcome, ExecutionPriority, JobSpec, ProgressObserver, ProgressState, SharedPriority,
};
