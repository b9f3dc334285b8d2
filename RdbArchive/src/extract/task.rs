//! Execution of a single extraction job

use std::sync::Arc;

use super::cancel::CancellationToken;
use super::hint::PriorityHint;
use super::progress::ProgressAggregator;
use super::types::{JobSpec, SharedPriority};
use crate::archive::Archive;

/// How a task ended. Only `Completed` and `Failed` are reported to the
/// aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Cancellation was observed before the archive was touched.
    Skipped,
    /// Cancellation was observed after the extract call returned; its
    /// result is discarded.
    Abandoned,
    Completed,
    Failed,
}

/// One job bound to the shared state of its batch.
pub struct ExtractionTask {
    index: usize,
    job: JobSpec,
    archive: Arc<dyn Archive>,
    token: CancellationToken,
    priority: SharedPriority,
    hint: Arc<dyn PriorityHint>,
    aggregator: Arc<ProgressAggregator>,
}

impl ExtractionTask {
    pub(crate) fn new(
        index: usize,
        job: JobSpec,
        archive: Arc<dyn Archive>,
        token: CancellationToken,
        priority: SharedPriority,
        hint: Arc<dyn PriorityHint>,
        aggregator: Arc<ProgressAggregator>,
    ) -> Self {
        Self {
            index,
            job,
            archive,
            token,
            priority,
            hint,
            aggregator,
        }
    }

    #[must_use]
    pub fn job(&self) -> &JobSpec {
        &self.job
    }

    /// Run the job to one of the [`TaskStatus`] outcomes.
    ///
    /// Cancellation is checked before the priority hint, right before the
    /// extract call, and after it returns. The extract call itself is never
    /// interrupted.
    pub fn run(self) -> TaskStatus {
        if self.token.is_cancelled() {
            tracing::trace!("Job {} skipped before start", self.index);
            return TaskStatus::Skipped;
        }

        let priority = self.priority.get();
        if let Err(e) = self.hint.apply(priority) {
            tracing::debug!("Could not apply {priority} priority for job {}: {e}", self.index);
        }

        if self.token.is_cancelled() {
            tracing::trace!("Job {} skipped after priority hint", self.index);
            return TaskStatus::Skipped;
        }

        let result = self.archive.extract(self.job.entry, &self.job.destination);

        // A failure caused by cancellation (e.g. a half-written file) is not
        // a batch error.
        if self.token.is_cancelled() {
            tracing::trace!("Job {} abandoned after cancellation", self.index);
            return TaskStatus::Abandoned;
        }

        match result {
            Ok(()) => {
                self.aggregator.report_completed();
                TaskStatus::Completed
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to extract entry {} to {}: {e}",
                    self.job.entry,
                    self.job.destination.display()
                );
                self.aggregator.report_failed();
                TaskStatus::Failed
            }
        }
    }
}

impl std::fmt::Debug for ExtractionTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionTask")
            .field("index", &self.index)
            .field("job", &self.job)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{EntryId, MemoryArchive};
    use crate::error::{Error, Result};
    use crate::extract::hint::ThreadPriorityHint;
    use crate::extract::types::{BatchOutcome, ExecutionPriority};
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Archive whose extract call flips the token and then fails, as if the
    /// user cancelled mid-write.
    struct CancelDuringExtract(CancellationToken);

    impl Archive for CancelDuringExtract {
        fn entry_count(&self) -> usize {
            1
        }
        fn find_entry(&self, _hash: u32) -> Option<EntryId> {
            None
        }
        fn entry_name(&self, _id: EntryId) -> Result<&str> {
            Ok("x")
        }
        fn entry_hash(&self, _id: EntryId) -> Result<u32> {
            Ok(0)
        }
        fn extract(&self, id: EntryId, destination: &Path) -> Result<()> {
            self.0.cancel();
            Err(Error::ExtractionFailed {
                entry: id.0,
                path: destination.to_path_buf(),
                message: "interrupted".to_string(),
            })
        }
    }

    struct RecordingHint(Mutex<Vec<ExecutionPriority>>);

    impl PriorityHint for RecordingHint {
        fn apply(&self, priority: ExecutionPriority) -> std::io::Result<()> {
            self.0.lock().unwrap().push(priority);
            Err(std::io::Error::other("unsupported"))
        }
    }

    fn task(
        archive: Arc<dyn Archive>,
        token: &CancellationToken,
        aggregator: &Arc<ProgressAggregator>,
        destination: &Path,
    ) -> ExtractionTask {
        ExtractionTask::new(
            0,
            JobSpec::new(EntryId(0), destination),
            archive,
            token.clone(),
            SharedPriority::default(),
            Arc::new(ThreadPriorityHint),
            Arc::clone(aggregator),
        )
    }

    #[test]
    fn test_completed_task_reports() {
        let dir = tempdir().unwrap();
        let token = CancellationToken::new();
        let agg = Arc::new(ProgressAggregator::new(1, token.clone()));
        let archive = Arc::new(MemoryArchive::new().with_entry("a", "data"));

        let status = task(archive, &token, &agg, &dir.path().join("a")).run();
        assert_eq!(status, TaskStatus::Completed);
        assert_eq!(agg.outcome(), Some(BatchOutcome::Success));
    }

    #[test]
    fn test_cancelled_task_never_extracts() {
        let dir = tempdir().unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let agg = Arc::new(ProgressAggregator::new(1, token.clone()));
        let archive = Arc::new(MemoryArchive::new().with_entry("a", "data"));
        let dest = dir.path().join("a");

        let status = task(archive, &token, &agg, &dest).run();
        assert_eq!(status, TaskStatus::Skipped);
        assert!(!dest.exists());
        assert_eq!(agg.snapshot().completed, 0);
        assert_eq!(agg.outcome(), None);
    }

    #[test]
    fn test_failure_reports_and_cancels() {
        let dir = tempdir().unwrap();
        let token = CancellationToken::new();
        let agg = Arc::new(ProgressAggregator::new(1, token.clone()));
        // Entry 0 does not exist in an empty archive
        let archive = Arc::new(MemoryArchive::new());

        let status = task(archive, &token, &agg, &dir.path().join("a")).run();
        assert_eq!(status, TaskStatus::Failed);
        assert_eq!(agg.outcome(), Some(BatchOutcome::Failed));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_failure_after_cancel_is_suppressed() {
        let dir = tempdir().unwrap();
        let token = CancellationToken::new();
        let agg = Arc::new(ProgressAggregator::new(1, token.clone()));
        let archive = Arc::new(CancelDuringExtract(token.clone()));

        let status = task(archive, &token, &agg, &dir.path().join("a")).run();
        assert_eq!(status, TaskStatus::Abandoned);
        assert_eq!(agg.outcome(), None);
    }

    #[test]
    fn test_hint_reads_current_priority_and_errors_are_ignored() {
        let dir = tempdir().unwrap();
        let token = CancellationToken::new();
        let agg = Arc::new(ProgressAggregator::new(1, token.clone()));
        let hint = Arc::new(RecordingHint(Mutex::new(Vec::new())));
        let priority = SharedPriority::new(ExecutionPriority::Normal);
        priority.set(ExecutionPriority::Background);

        let task = ExtractionTask::new(
            0,
            JobSpec::new(EntryId(0), dir.path().join("a")),
            Arc::new(MemoryArchive::new().with_entry("a", "data")),
            token,
            priority,
            Arc::clone(&hint) as Arc<dyn PriorityHint>,
            Arc::clone(&agg),
        );
        assert_eq!(task.run(), TaskStatus::Completed);
        assert_eq!(*hint.0.lock().unwrap(), vec![ExecutionPriority::Background]);
    }
}
