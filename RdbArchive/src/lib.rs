//! # RdbArchive
//!
//! Archive access and batch extraction for RDB game-asset archives.
//!
//! The crate has two halves:
//!
//! - [`archive`] - the [`Archive`](archive::Archive) contract the scheduler
//!   extracts through, plus directory-backed and in-memory implementations
//! - [`extract`] - the batch scheduler: a bounded, cancellable, fail-fast
//!   [`JobDispatcher`](extract::JobDispatcher)
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use rdbarchive::prelude::*;
//!
//! let archive = Arc::new(DirectoryArchive::open("unpacked/")?);
//! let jobs = plan_selection(archive.as_ref(), &[entry_hash("ui/logo.dds")], "out/".as_ref())?;
//! prepare_destinations(&jobs)?;
//!
//! let dispatcher = JobDispatcher::new(archive, DispatcherConfig::default())?;
//! dispatcher.configure(jobs, ExecutionPriority::Normal)?;
//! match dispatcher.start()? {
//!     BatchOutcome::Success => println!("done"),
//!     BatchOutcome::Cancelled => println!("cancelled"),
//!     BatchOutcome::Failed => println!("some files failed"),
//! }
//! # Ok::<(), rdbarchive::Error>(())
//! ```

pub mod archive;
pub mod error;
pub mod extract;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::archive::{Archive, DirectoryArchive, EntryId, MemoryArchive, entry_hash};
    pub use crate::error::{Error, Result};
    pub use crate::extract::{
        BatchOutcome, CancellationToken, DispatcherConfig, ExecutionPriority, JobDispatcher,
        JobSpec, ProgressState, plan_all, plan_selection, prepare_destinations,
    };
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
