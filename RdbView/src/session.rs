//! Export sessions: a selection or a whole archive written to a folder
//!
//! An [`ExportSession`] pairs one archive with one [`JobDispatcher`]. The
//! caller runs an export on one thread and may cancel it or change its
//! priority from another through a [`SessionControl`], or poll its progress
//! through [`dispatcher`](ExportSession::dispatcher).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rdbarchive::archive::Archive;
use rdbarchive::extract::{
    BatchOutcome, ExecutionPriority, JobDispatcher, JobSpec, ProgressObserver, SharedPriority,
    plan_all, plan_selection, prepare_destinations,
};

use crate::config::ExtractConfig;
use crate::error::Result;

/// Folder an export should write into when exports go to a subfolder named
/// after the archive.
///
/// `out_dir` is used as is when its own name already matches `archive_name`
/// (ignoring case), so exporting twice into the same place does not nest.
#[must_use]
pub fn subfolder_target(out_dir: &Path, archive_name: &str) -> PathBuf {
    let wanted = archive_name.to_lowercase();
    let already_there = out_dir
        .file_name()
        .is_some_and(|name| name.to_string_lossy().to_lowercase() == wanted);
    if already_there {
        out_dir.to_path_buf()
    } else {
        out_dir.join(archive_name)
    }
}

/// Cancels or re-prioritizes the exports of one session from another
/// thread.
///
/// A cancel that arrives before the export reaches the dispatcher is kept
/// and applied when it does.
#[derive(Debug, Clone)]
pub struct SessionControl {
    cancel_requested: Arc<AtomicBool>,
    priority: SharedPriority,
    dispatcher: Arc<JobDispatcher>,
}

impl SessionControl {
    pub fn cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
        self.dispatcher.cancel();
    }

    /// Change the priority of the current export and of later ones.
    pub fn set_priority(&self, priority: ExecutionPriority) {
        self.priority.set(priority);
        self.dispatcher.set_priority(priority);
    }
}

pub struct ExportSession {
    archive: Arc<dyn Archive>,
    dispatcher: Arc<JobDispatcher>,
    config: ExtractConfig,
    subfolder: Option<String>,
    cancel_requested: Arc<AtomicBool>,
    priority: SharedPriority,
}

impl ExportSession {
    pub fn new(archive: Arc<dyn Archive>, config: ExtractConfig) -> Result<Self> {
        let dispatcher = JobDispatcher::new(Arc::clone(&archive), config.dispatcher_config())?;
        Ok(Self::from_parts(archive, dispatcher, config))
    }

    /// Like [`new`](Self::new), reporting progress to `observer`.
    pub fn with_observer(
        archive: Arc<dyn Archive>,
        config: ExtractConfig,
        observer: ProgressObserver,
    ) -> Result<Self> {
        let dispatcher = JobDispatcher::new(Arc::clone(&archive), config.dispatcher_config())?
            .with_observer(observer);
        Ok(Self::from_parts(archive, dispatcher, config))
    }

    fn from_parts(
        archive: Arc<dyn Archive>,
        dispatcher: JobDispatcher,
        config: ExtractConfig,
    ) -> Self {
        Self {
            archive,
            dispatcher: Arc::new(dispatcher),
            config,
            subfolder: None,
            cancel_requested: Arc::new(AtomicBool::new(false)),
            priority: SharedPriority::new(config.priority),
        }
    }

    /// Write exports into a folder called `name` inside the chosen output
    /// folder. See [`subfolder_target`].
    #[must_use]
    pub fn with_subfolder(mut self, name: impl Into<String>) -> Self {
        self.subfolder = Some(name.into());
        self
    }

    /// Handle for cancelling or re-prioritizing from another thread.
    #[must_use]
    pub fn control(&self) -> SessionControl {
        SessionControl {
            cancel_requested: Arc::clone(&self.cancel_requested),
            priority: self.priority.clone(),
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }

    /// Handle for polling progress from another thread.
    #[must_use]
    pub fn dispatcher(&self) -> Arc<JobDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    #[must_use]
    pub fn archive(&self) -> &dyn Archive {
        self.archive.as_ref()
    }

    /// Folder exports are written into for the chosen `out_dir`.
    #[must_use]
    pub fn output_dir(&self, out_dir: &Path) -> PathBuf {
        match &self.subfolder {
            Some(name) => subfolder_target(out_dir, name),
            None => out_dir.to_path_buf(),
        }
    }

    /// Export the entries whose hashes are in `hashes`.
    ///
    /// An unknown hash fails before anything is written.
    pub fn export_selection(&self, hashes: &[u32], out_dir: &Path) -> Result<BatchOutcome> {
        let out_dir = self.output_dir(out_dir);
        let jobs = plan_selection(self.archive.as_ref(), hashes, &out_dir)?;
        self.run(&out_dir, jobs)
    }

    /// Export every entry of the archive.
    pub fn export_all(&self, out_dir: &Path) -> Result<BatchOutcome> {
        let out_dir = self.output_dir(out_dir);
        let jobs = plan_all(self.archive.as_ref(), &out_dir)?;
        self.run(&out_dir, jobs)
    }

    fn run(&self, out_dir: &Path, jobs: Vec<JobSpec>) -> Result<BatchOutcome> {
        tracing::debug!(
            "Exporting {} entries to {} ({} worker(s), {} priority)",
            jobs.len(),
            out_dir.display(),
            self.config.capacity,
            self.priority.get()
        );
        std::fs::create_dir_all(out_dir)?;
        prepare_destinations(&jobs)?;

        self.dispatcher.configure(jobs, self.priority.get())?;
        // A change made while configuring would have been overwritten
        self.dispatcher.set_priority(self.priority.get());
        if self.cancel_requested.swap(false, Ordering::SeqCst) {
            self.dispatcher.cancel();
        }

        let outcome = self.dispatcher.start();
        self.cancel_requested.store(false, Ordering::SeqCst);
        Ok(outcome?)
    }
}

impl std::fmt::Debug for ExportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportSession")
            .field("entries", &self.archive.entry_count())
            .field("config", &self.config)
            .field("subfolder", &self.subfolder)
            .finish_non_exhaustive()
    }
}
