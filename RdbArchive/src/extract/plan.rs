//! Turning a selection into a job list
//!
//! A selection is either a set of entry hashes or the whole archive. Each
//! entry is written to `out_dir` joined with its archive-relative name.

use std::path::{Component, Path, PathBuf};

use super::types::JobSpec;
use crate::archive::{Archive, EntryId};
use crate::error::{Error, Result};

/// Build jobs for the entries matching `hashes`, in selection order.
///
/// Fails with [`Error::EntryNotFound`] on the first hash that does not
/// resolve.
pub fn plan_selection(
    archive: &dyn Archive,
    hashes: &[u32],
    out_dir: &Path,
) -> Result<Vec<JobSpec>> {
    hashes
        .iter()
        .map(|&hash| {
            let entry = archive
                .find_entry(hash)
                .ok_or(Error::EntryNotFound { hash })?;
            job_for(archive, entry, out_dir)
        })
        .collect()
}

/// Build one job per archive entry.
pub fn plan_all(archive: &dyn Archive, out_dir: &Path) -> Result<Vec<JobSpec>> {
    (0..archive.entry_count())
        .map(|index| job_for(archive, EntryId(index), out_dir))
        .collect()
}

fn job_for(archive: &dyn Archive, entry: EntryId, out_dir: &Path) -> Result<JobSpec> {
    let name = archive.entry_name(entry)?;
    Ok(JobSpec::new(entry, destination_for(out_dir, name)?))
}

/// Join an archive-relative name onto `out_dir`, refusing names that would
/// land outside it.
pub fn destination_for(out_dir: &Path, name: &str) -> Result<PathBuf> {
    let mut destination = out_dir.to_path_buf();
    let mut pushed = false;

    for part in name.split(['/', '\\']).filter(|p| !p.is_empty()) {
        let mut components = Path::new(part).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(segment)), None) => {
                destination.push(segment);
                pushed = true;
            }
            _ => return Err(Error::InvalidPath(format!("unsafe entry name: {name}"))),
        }
    }

    if pushed {
        Ok(destination)
    } else {
        Err(Error::InvalidPath(format!("empty entry name: {name:?}")))
    }
}

/// Create the parent directory of every destination. Extraction itself
/// never creates directories.
pub fn prepare_destinations(jobs: &[JobSpec]) -> Result<()> {
    for job in jobs {
        if let Some(parent) = job.destination.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{MemoryArchive, entry_hash};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn sample() -> MemoryArchive {
        MemoryArchive::new()
            .with_entry("textures/hero.dds", "a")
            .with_entry("sounds/hit.wav", "b")
            .with_entry("readme.txt", "c")
    }

    #[test]
    fn test_plan_selection_resolves_hashes() {
        let archive = sample();
        let out = Path::new("out");
        let jobs = plan_selection(
            &archive,
            &[entry_hash("readme.txt"), entry_hash("textures/hero.dds")],
            out,
        )
        .unwrap();

        assert_eq!(
            jobs,
            vec![
                JobSpec::new(EntryId(2), out.join("readme.txt")),
                JobSpec::new(EntryId(0), out.join("textures").join("hero.dds")),
            ]
        );
    }

    #[test]
    fn test_plan_selection_unknown_hash() {
        let archive = sample();
        let result = plan_selection(&archive, &[0xdead_beef], Path::new("out"));
        assert!(matches!(result, Err(Error::EntryNotFound { hash: 0xdead_beef })));
    }

    #[test]
    fn test_plan_all_covers_every_entry() {
        let archive = sample();
        let jobs = plan_all(&archive, Path::new("out")).unwrap();
        let entries: Vec<_> = jobs.iter().map(|j| j.entry).collect();
        assert_eq!(entries, vec![EntryId(0), EntryId(1), EntryId(2)]);
    }

    #[test]
    fn test_destination_rejects_escapes() {
        let out = Path::new("out");
        assert!(destination_for(out, "../etc/passwd").is_err());
        assert!(destination_for(out, "a/./b").is_err());
        assert!(destination_for(out, "").is_err());
        assert_eq!(
            destination_for(out, "Data\\ui\\icon.dds").unwrap(),
            out.join("Data").join("ui").join("icon.dds")
        );
        // Leading separators are dropped rather than treated as absolute
        assert_eq!(destination_for(out, "/x.bin").unwrap(), out.join("x.bin"));
    }

    #[test]
    fn test_prepare_destinations_creates_parents() {
        let dir = tempdir().unwrap();
        let jobs = plan_all(&sample(), dir.path()).unwrap();
        prepare_destinations(&jobs).unwrap();
        assert!(dir.path().join("textures").is_dir());
        assert!(dir.path().join("sounds").is_dir());
    }
}
