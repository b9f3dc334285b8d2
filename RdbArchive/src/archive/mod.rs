//! Archive contract consumed by the extraction scheduler
//!
//! An [`Archive`] is the external collaborator behind every batch: it lists
//! entries, resolves a content hash to an entry, and copies one entry's bytes
//! to a destination path. Parsing of packed container formats lives outside
//! this crate; two simple implementations are provided here:
//!
//! - [`DirectoryArchive`] - a loose directory tree treated as an archive
//! - [`MemoryArchive`] - entries held in memory

mod directory;
mod memory;
mod table;

use std::fmt;
use std::path::Path;

use crate::error::Result;

pub use directory::DirectoryArchive;
pub use memory::MemoryArchive;
pub use table::{EntryTable, entry_hash};

/// Index of an entry inside one archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub usize);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Read access to the entries of one archive.
///
/// `extract` is assumed to block for the duration of the copy. Implementations
/// are not required to tolerate concurrent `extract` calls against the same
/// handle; the dispatcher bounds how many run at once (see
/// [`DispatcherConfig::capacity`](crate::extract::DispatcherConfig::capacity)).
pub trait Archive: Send + Sync {
    /// Number of entries in the archive.
    fn entry_count(&self) -> usize;

    /// Resolve a content hash to an entry.
    fn find_entry(&self, hash: u32) -> Option<EntryId>;

    /// Archive-relative name of an entry, using `/` separators.
    fn entry_name(&self, id: EntryId) -> Result<&str>;

    /// Content hash of an entry.
    fn entry_hash(&self, id: EntryId) -> Result<u32>;

    /// Write the entry's bytes to `destination`, creating or overwriting the
    /// file. Parent directories are not created.
    fn extract(&self, id: EntryId, destination: &Path) -> Result<()>;
}
