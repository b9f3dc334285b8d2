//! Loose directory tree exposed as an archive

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{Archive, EntryId, EntryTable};
use crate::error::{Error, Result};

/// A directory whose files are the archive's entries.
///
/// Entries are ordered by their relative path. Each file's hash is the
/// [`entry_hash`](super::entry_hash) of that relative path. Names that are
/// not valid UTF-8 are shown and hashed lossily, but extraction reads the
/// file through its real path.
#[derive(Debug)]
pub struct DirectoryArchive {
    root: PathBuf,
    table: EntryTable,
    paths: Vec<PathBuf>,
}

impl DirectoryArchive {
    /// Index every file under `root`, skipping `.DS_Store`.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(Error::InvalidPath(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&root).follow_links(true) {
            let entry = entry?;
            if !entry.file_type().is_file()
                || entry.file_name() == std::ffi::OsStr::new(".DS_Store")
            {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&root)
                .map_err(|e| Error::InvalidPath(e.to_string()))?
                .to_path_buf();
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push((name, relative));
        }
        files.sort();

        let mut table = EntryTable::new();
        let mut paths = Vec::with_capacity(files.len());
        for (name, relative) in files {
            table.push(name);
            paths.push(relative);
        }

        tracing::debug!("Indexed {} entries under {}", table.len(), root.display());
        Ok(Self { root, table, paths })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Archive for DirectoryArchive {
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
        let source = self.root.join(&self.paths[id.0]);
        std::fs::copy(&source, destination).map_err(|e| Error::ExtractionFailed {
            entry: id.0,
            path: destination.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::entry_hash;
    use tempfile::tempdir;

    #[test]
    fn test_open_indexes_nested_files() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("textures/ui")).unwrap();
        std::fs::write(dir.path().join("textures/ui/icon.dds"), b"dds").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"hi").unwrap();
        std::fs::write(dir.path().join(".DS_Store"), b"").unwrap();

        let archive = DirectoryArchive::open(dir.path()).unwrap();
        assert_eq!(archive.entry_count(), 2);
        assert_eq!(archive.entry_name(EntryId(0)).unwrap(), "readme.txt");
        assert_eq!(
            archive.find_entry(entry_hash("textures/ui/icon.dds")),
            Some(EntryId(1))
        );
    }

    #[test]
    fn test_extract_copies_bytes() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        std::fs::write(src.path().join("a.bin"), b"payload").unwrap();

        let archive = DirectoryArchive::open(src.path()).unwrap();
        let dest = out.path().join("a.bin");
        archive.extract(EntryId(0), &dest).unwrap();
        assert_eq!(std::fs::read(dest).unwrap(), b"payload");
    }

    #[test]
    fn test_extract_without_parent_fails() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        std::fs::write(src.path().join("a.bin"), b"payload").unwrap();

        let archive = DirectoryArchive::open(src.path()).unwrap();
        let dest = out.path().join("missing/a.bin");
        assert!(matches!(
            archive.extract(EntryId(0), &dest),
            Err(Error::ExtractionFailed { entry: 0, .. })
        ));
    }

    // APFS refuses non UTF-8 names, so this only runs on Linux
    #[cfg(target_os = "linux")]
    #[test]
    fn test_extract_non_utf8_name() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        std::fs::write(src.path().join(OsStr::from_bytes(b"bad\xff.bin")), b"raw").unwrap();
        std::fs::write(src.path().join("good.bin"), b"ok").unwrap();

        let archive = DirectoryArchive::open(src.path()).unwrap();
        assert_eq!(archive.entry_count(), 2);
        assert_eq!(archive.entry_name(EntryId(0)).unwrap(), "bad\u{fffd}.bin");

        for index in 0..archive.entry_count() {
            let dest = out.path().join(format!("{index}.bin"));
            archive.extract(EntryId(index), &dest).unwrap();
        }
        assert_eq!(std::fs::read(out.path().join("0.bin")).unwrap(), b"raw");
        assert_eq!(std::fs::read(out.path().join("1.bin")).unwrap(), b"ok");
    }

    #[test]
    fn test_open_rejects_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("x");
        std::fs::write(&file, b"").unwrap();
        assert!(matches!(
            DirectoryArchive::open(&file),
            Err(Error::InvalidPath(_))
        ));
    }
}
