//! In-memory archive

use std::path::Path;

use super::{Archive, EntryId, EntryTable};
use crate::error::{Error, Result};

/// Archive whose entries are byte buffers held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    table: EntryTable,
    data: Vec<Vec<u8>>,
}

impl MemoryArchive {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry and return its id.
    pub fn push(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> EntryId {
        self.data.push(data.into());
        self.table.push(name)
    }

    /// Builder form of [`push`](Self::push).
    #[must_use]
    pub fn with_entry(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.push(name, data);
        self
    }
}

impl Archive for MemoryArchive {
    fn entry_count(&self) -> usize {
        self.table.len()
    }

    fn find_entry(&self, hash: u32) -> Option<EntryId> {
        self.table.find(hash)
    }

    fn entry_name(&self, id: EntryId) -> Result<&str> {
        self.table.name(id)
    }

    fn entry_hash(&self, id: EntryId) -> Result<u32> {
        self.table.hash(id)
    }

    fn extract(&self, id: EntryId, destination: &Path) -> Result<()> {
        self.table.check(id)?;
        std::fs::write(destination, &self.data[id.0]).map_err(|e| Error::ExtractionFailed {
            entry: id.0,
            path: destination.to_path_buf(),
            message: e.to_string(),
        })
    }
}
