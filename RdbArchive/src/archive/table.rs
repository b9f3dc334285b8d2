//! Name and hash index shared by the archive implementations

use std::collections::HashMap;

use super::EntryId;
use crate::error::{Error, Result};

/// Compute the lookup hash of an archive-relative name.
///
/// Names are normalized to lowercase with `/` separators before hashing, so
/// `Textures\Hero.dds` and `textures/hero.dds` resolve to the same entry.
#[must_use]
pub fn entry_hash(name: &str) -> u32 {
    let normalized = name.replace('\\', "/").to_lowercase();
    crc32fast::hash(normalized.as_bytes())
}

/// Ordered entry names with a hash lookup.
#[derive(Debug, Clone, Default)]
pub struct EntryTable {
    names: Vec<String>,
    hashes: Vec<u32>,
    by_hash: HashMap<u32, EntryId>,
}

impl EntryTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a name and return its id. On a hash collision the earlier entry
    /// keeps the lookup slot.
    pub fn push(&mut self, name: impl Into<String>) -> EntryId {
        let name = name.into();
        let hash = entry_hash(&name);
        let id = EntryId(self.names.len());
        self.names.push(name);
        self.hashes.push(hash);
        self.by_hash.entry(hash).or_insert(id);
        id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn find(&self, hash: u32) -> Option<EntryId> {
        self.by_hash.get(&hash).copied()
    }

    /// Check that `id` is in range.
    pub fn check(&self, id: EntryId) -> Result<()> {
        if id.0 < self.names.len() {
            Ok(())
        } else {
            Err(Error::EntryOutOfRange {
                index: id.0,
                count: self.names.len(),
            })
        }
    }

    pub fn name(&self, id: EntryId) -> Result<&str> {
        self.check(id)?;
        Ok(&self.names[id.0])
    }

    pub fn hash(&self, id: EntryId) -> Result<u32> {
        self.check(id)?;
        Ok(self.hashes[id.0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_ignores_case_and_separator() {
        assert_eq!(entry_hash("Textures\\Hero.dds"), entry_hash("textures/hero.dds"));
        assert_ne!(entry_hash("a.txt"), entry_hash("b.txt"));
    }

    #[test]
    fn test_table_lookup() {
        let mut table = EntryTable::new();
        let a = table.push("data/a.bin");
        let b = table.push("data/b.bin");

        assert_eq!(table.len(), 2);
        assert_eq!(table.find(entry_hash("data/b.bin")), Some(b));
        assert_eq!(table.name(a).unwrap(), "data/a.bin");
        assert!(table.find(entry_hash("missing")).is_none());
    }

    #[test]
    fn test_out_of_range() {
        let table = EntryTable::new();
        assert!(matches!(
            table.name(EntryId(3)),
            Err(Error::EntryOutOfRange { index: 3, count: 0 })
        ));
    }

    #[test]
    fn test_collision_keeps_first() {
        let mut table = EntryTable::new();
        let first = table.push("Same.txt");
        table.push("same.txt");
        assert_eq!(table.find(entry_hash("same.txt")), Some(first));
    }
}
