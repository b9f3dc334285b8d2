//! Race-free progress counting and terminal outcome assignment
//!
//! Every task of a batch reports into one [`ProgressAggregator`]. The
//! completed count and the outcome live behind a single mutex so that the
//! "are we done" decision is made on a consistent snapshot, and the terminal
//! outcome is assigned exactly once. A mirror of the completed count is kept
//! in an atomic for lock-free polling from a UI or progress bar.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use super::cancel::CancellationToken;
use super::types::{BatchOutcome, ProgressObserver, ProgressState};

#[derive(Debug, Default)]
struct Counters {
    completed: usize,
    outcome: Option<BatchOutcome>,
}

/// Collects completion and failure reports from concurrent tasks.
pub struct ProgressAggregator {
    total: usize,
    completed: AtomicUsize,
    state: Mutex<Counters>,
    terminal: Condvar,
    token: CancellationToken,
    observer: Option<ProgressObserver>,
}

impl ProgressAggregator {
    /// Create an aggregator for `total` jobs. A failure report cancels
    /// `token`. An empty batch starts out as [`BatchOutcome::Success`].
    #[must_use]
    pub fn new(total: usize, token: CancellationToken) -> Self {
        let outcome = (total == 0).then_some(BatchOutcome::Success);
        Self {
            total,
            completed: AtomicUsize::new(0),
            state: Mutex::new(Counters {
                completed: 0,
                outcome,
            }),
            terminal: Condvar::new(),
            token,
            observer: None,
        }
    }

    /// Attach a callback that receives a snapshot after each counted
    /// completion and at the terminal transition.
    #[must_use]
    pub fn with_observer(mut self, observer: Option<ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    // Critical sections never leave `Counters` half-updated, so a poisoned
    // lock still holds valid data.
    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot_of(&self, counters: &Counters) -> ProgressState {
        ProgressState {
            total: self.total,
            completed: counters.completed,
            outcome: counters.outcome,
        }
    }

    fn notify(&self, state: &ProgressState) {
        if let Some(observer) = &self.observer {
            observer(state);
        }
    }

    /// Count one successful job. The report that brings `completed` to
    /// `total` finalizes the batch as [`BatchOutcome::Success`], unless an
    /// outcome was already assigned.
    pub fn report_completed(&self) {
        let state = {
            let mut counters = self.lock();
            if counters.completed >= self.total {
                tracing::warn!("Completion reported past batch total {}", self.total);
                return;
            }
            counters.completed += 1;
            self.completed.store(counters.completed, Ordering::SeqCst);

            if counters.completed == self.total && counters.outcome.is_none() {
                counters.outcome = Some(BatchOutcome::Success);
                self.terminal.notify_all();
            }
            self.snapshot_of(&counters)
        };
        self.notify(&state);
    }

    /// Record a hard failure. Every one cancels the remaining work; the
    /// first one then finalizes the batch as [`BatchOutcome::Failed`].
    ///
    /// The token is set before the outcome becomes visible, so no task can
    /// pass a checkpoint once a waiter or observer has seen the failure.
    ///
    /// Returns `true` if this report assigned the outcome.
    pub fn report_failed(&self) -> bool {
        self.token.cancel();
        self.finalize(BatchOutcome::Failed)
    }

    /// Finalize the batch as [`BatchOutcome::Cancelled`] if nothing else has.
    ///
    /// Returns `true` if this report assigned the outcome.
    pub fn report_cancelled(&self) -> bool {
        self.finalize(BatchOutcome::Cancelled)
    }

    fn finalize(&self, outcome: BatchOutcome) -> bool {
        let state = {
            let mut counters = self.lock();
            if counters.outcome.is_some() {
                return false;
            }
            counters.outcome = Some(outcome);
            self.terminal.notify_all();
            self.snapshot_of(&counters)
        };
        self.notify(&state);
        true
    }

    /// Lock-free `(completed, total)` for progress display.
    #[must_use]
    pub fn current_progress(&self) -> (usize, usize) {
        (self.completed.load(Ordering::SeqCst), self.total)
    }

    /// Consistent copy of the counters and outcome.
    #[must_use]
    pub fn snapshot(&self) -> ProgressState {
        let counters = self.lock();
        self.snapshot_of(&counters)
    }

    #[must_use]
    pub fn outcome(&self) -> Option<BatchOutcome> {
        self.lock().outcome
    }

    /// Block until an outcome is assigned.
    pub fn wait(&self) -> BatchOutcome {
        let mut counters = self.lock();
        loop {
            if let Some(outcome) = counters.outcome {
                return outcome;
            }
            counters = self
                .terminal
                .wait(counters)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl std::fmt::Debug for ProgressAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressAggregator")
            .field("total", &self.total)
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}
