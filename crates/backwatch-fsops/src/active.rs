//! Folders that currently have a shrink job running.
//!
//! The retention sweeper consults this set so a job finishing in one folder
//! never deletes the folder of a job still running in another.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared, counted set of busy backup folders.
#[derive(Debug, Clone, Default)]
pub struct ActiveFolders {
    busy: Arc<Mutex<HashMap<PathBuf, usize>>>,
}

impl ActiveFolders {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `folder` busy until the returned guard is dropped.
    #[must_use]
    pub fn hold(&self, folder: &Path) -> ActiveFolderGuard {
        let key = folder_key(folder);
        *self.lock().entry(key.clone()).or_insert(0) += 1;
        ActiveFolderGuard {
            folders: self.clone(),
            key,
        }
    }

    /// Whether a job is running in `folder`.
    #[must_use]
    pub fn contains(&self, folder: &Path) -> bool {
        self.lock().contains_key(&folder_key(folder))
    }

    /// Number of distinct busy folders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no folder is busy.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn release(&self, key: &Path) {
        let mut busy = self.lock();
        if let Some(count) = busy.get_mut(key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                busy.remove(key);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, usize>> {
        self.busy.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keeps a folder in [`ActiveFolders`] while alive.
#[derive(Debug)]
pub struct ActiveFolderGuard {
    folders: ActiveFolders,
    key: PathBuf,
}

impl Drop for ActiveFolderGuard {
    fn drop(&mut self) {
        self.folders.release(&self.key);
    }
}

fn folder_key(folder: &Path) -> PathBuf {
    fs::canonicalize(folder).unwrap_or_else(|_| folder.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_are_counted_per_folder() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let folders = ActiveFolders::new();
        let first = folders.hold(dir.path());
        let second = folders.clone().hold(dir.path());
        assert_eq!(folders.len(), 1);

        drop(first);
        assert!(folders.contains(dir.path()));
        drop(second);
        assert!(folders.is_empty());
        Ok(())
    }

    #[test]
    fn lookups_see_through_relative_spellings() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let inner = dir.path().join("inner");
        fs::create_dir(&inner)?;
        let folders = ActiveFolders::new();
        let _guard = folders.hold(&inner);
        assert!(folders.contains(&inner.join("..").join("inner")));
        Ok(())
    }
}
