//! Process-wide record of folders already handed to the settle detector.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Set of claimed backup folders shared by every dispatch path.
#[derive(Debug, Clone, Default)]
pub struct WatchState {
    claimed: Arc<Mutex<HashSet<PathBuf>>>,
}

impl WatchState {
    /// Empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `folder`. Returns `false` when it was already claimed.
    pub fn claim(&self, folder: &Path) -> bool {
        self.lock().insert(folder.to_path_buf())
    }

    /// Forget `folder` so a later event may claim it again.
    pub fn release(&self, folder: &Path) -> bool {
        self.lock().remove(folder)
    }

    /// Whether `folder` is claimed.
    #[must_use]
    pub fn contains(&self, folder: &Path) -> bool {
        self.lock().contains(folder)
    }

    /// Number of claimed folders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Claimed folders, sorted.
    #[must_use]
    pub fn snapshot(&self) -> Vec<PathBuf> {
        let mut folders: Vec<PathBuf> = self.lock().iter().cloned().collect();
        folders.sort();
        folders
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.claimed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
