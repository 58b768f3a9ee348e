//! Output files are written under temporary names next to their destination,
//! and only renamed into place once every one of them has been written.

use crate::Result;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Default)]
pub struct Staging {
    files: Vec<(NamedTempFile, PathBuf)>,
}

impl Staging {
    pub fn new() -> Staging {
        Staging::default()
    }

    /// reserve a temporary file beside `dest`, and return the path to write it through
    pub fn stage(&mut self, dest: impl AsRef<Path>) -> Result<PathBuf> {
        let dest = dest.as_ref();
        let dir = match dest.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let temp = NamedTempFile::new_in(dir)?;
        let path = temp.path().to_path_buf();
        debug!("staging {} as {}", dest.display(), path.display());
        self.files.push((temp, dest.to_path_buf()));
        Ok(path)
    }

    /// move every staged file to its destination, in staging order.
    ///
    /// If a rename fails, destinations already moved into place are removed again.
    /// Dropping a `Staging` without committing deletes the temporary files.
    pub fn commit(self) -> Result<()> {
        let mut landed: Vec<PathBuf> = Vec::with_capacity(self.files.len());
        for (temp, dest) in self.files {
            if let Err(e) = temp.persist(&dest) {
                for path in &landed {
                    if let Err(remove) = fs::remove_file(path) {
                        warn!("couldn't remove {}: {remove}", path.display());
                    }
                }
                return Err(e.error.into());
            }
            landed.push(dest);
        }
        Ok(())
    }
}

#[cfg(test)]
fn dir_names(dir: &Path) -> Vec<String> {
    let mut names = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect::<Vec<String>>();
    names.sort();
    names
}

#[test]
fn test_commit_moves_into_place() {
    let dir = tempfile::tempdir().unwrap();
    let mut staging = Staging::new();
    let a = staging.stage(dir.path().join("a.txt")).unwrap();
    let b = staging.stage(dir.path().join("b.txt")).unwrap();
    fs::write(&a, "first").unwrap();
    fs::write(&b, "second").unwrap();
    assert!(!dir.path().join("a.txt").exists());

    staging.commit().unwrap();
    assert_eq!(dir_names(dir.path()), vec!["a.txt", "b.txt"]);
    assert_eq!(fs::read_to_string(dir.path().join("b.txt")).unwrap(), "second");
}

#[test]
fn test_dropped_staging_leaves_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut staging = Staging::new();
    fs::write(staging.stage(dir.path().join("a.txt")).unwrap(), "data").unwrap();
    drop(staging);
    assert!(dir_names(dir.path()).is_empty());
}

#[test]
fn test_failed_commit_removes_earlier_files() {
    let dir = tempfile::tempdir().unwrap();
    // a directory in the way of the second destination
    fs::create_dir(dir.path().join("b.txt")).unwrap();

    let mut staging = Staging::new();
    fs::write(staging.stage(dir.path().join("a.txt")).unwrap(), "a").unwrap();
    fs::write(staging.stage(dir.path().join("b.txt")).unwrap(), "b").unwrap();
    assert!(staging.commit().is_err());
    assert_eq!(dir_names(dir.path()), vec!["b.txt"]);
}
