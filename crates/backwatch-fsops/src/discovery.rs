//! Enumeration of image artifacts and sibling backup folders.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{FsOpsError, FsOpsResult};
use crate::naming::{BackupFolderName, BackupNaming};

/// Image artifacts in `folder` with the given extension, sorted by path.
///
/// # Errors
///
/// Returns an error when the folder cannot be read.
pub fn list_images(folder: &Path, extension: &str) -> FsOpsResult<Vec<PathBuf>> {
    let entries =
        fs::read_dir(folder).map_err(|err| FsOpsError::io("list_images", folder, err))?;
    let mut images = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| FsOpsError::io("list_images.entry", folder, err))?;
        let path = entry.path();
        let is_file = entry
            .file_type()
            .map_err(|err| FsOpsError::io("list_images.file_type", &path, err))?
            .is_file();
        if is_file && path.extension().is_some_and(|ext| ext == extension) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// Backup folder found next to another one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupEntry {
    /// Folder path.
    pub path: PathBuf,
    /// Timestamp encoded in the folder name.
    pub created_at: NaiveDateTime,
}

/// Backup folders directly under `parent`, oldest first.
///
/// Names that do not match are skipped silently; names that match but carry
/// an invalid timestamp are logged and skipped.
///
/// # Errors
///
/// Returns an error when `parent` cannot be read.
pub fn scan_backups(parent: &Path, naming: &BackupNaming) -> FsOpsResult<Vec<BackupEntry>> {
    let entries =
        fs::read_dir(parent).map_err(|err| FsOpsError::io("scan_backups", parent, err))?;
    let mut backups = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| FsOpsError::io("scan_backups.entry", parent, err))?;
        let path = entry.path();
        if !entry.file_type().is_ok_and(|kind| kind.is_dir()) {
            continue;
        }
        match naming.parse_path(&path) {
            Ok(Some(BackupFolderName { created_at, .. })) => {
                backups.push(BackupEntry { path, created_at });
            }
            Ok(None) => debug!(path = %path.display(), "skipping non-backup folder"),
            Err(err) => warn!(path = %path.display(), error = %err, "skipping backup folder with invalid timestamp"),
        }
    }
    backups.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.path.cmp(&b.path)));
    Ok(backups)
}

/// Sibling backups strictly older than `cutoff`, never including `exclude`.
///
/// # Errors
///
/// Returns an error when `parent` cannot be read.
pub fn stale_backups(
    parent: &Path,
    cutoff: NaiveDateTime,
    exclude: &Path,
    naming: &BackupNaming,
) -> FsOpsResult<Vec<BackupEntry>> {
    Ok(scan_backups(parent, naming)?
        .into_iter()
        .filter(|entry| !is_same_folder(&entry.path, exclude) && entry.created_at < cutoff)
        .collect())
}

pub(crate) fn is_same_folder(candidate: &Path, current: &Path) -> bool {
    if candidate == current {
        return true;
    }
    match (candidate.file_name(), current.file_name()) {
        (Some(a), Some(b)) if a == b => true,
        _ => matches!(
            (fs::canonicalize(candidate), fs::canonicalize(current)),
            (Ok(a), Ok(b)) if a == b
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use backwatch_test_support::fixtures::{BackupTree, now, write_image, write_marker};
    use std::fs;

    #[test]
    fn list_images_filters_by_extension_and_sorts() -> Result<()> {
        let tree = BackupTree::new()?;
        let folder = tree.backup_at(now())?;
        write_image(&folder, "b.img")?;
        write_image(&folder, "a.img")?;
        write_image(&folder, "c.img.gz")?;
        write_marker(&folder)?;
        fs::create_dir(folder.join("nested.img"))?;

        let images = list_images(&folder, "img")?;
        assert_eq!(images, vec![folder.join("a.img"), folder.join("b.img")]);
        Ok(())
    }

    #[test]
    fn scan_skips_foreign_and_invalid_folders() -> Result<()> {
        let tree = BackupTree::new()?;
        let reference = now();
        let older = tree.backup_hours_before(reference, 10)?;
        let newer = tree.backup_hours_before(reference, 1)?;
        tree.plain_dir("lost+found")?;
        tree.plain_dir("raspihaupt-dd-backup-20231399-000000")?;
        fs::write(tree.path().join("raspihaupt-dd-backup-20240101-000000"), b"file")?;

        let naming = BackupNaming::new(Some("raspihaupt"))?;
        let found = scan_backups(tree.path(), &naming)?;
        let paths: Vec<_> = found.iter().map(|entry| entry.path.clone()).collect();
        assert_eq!(paths, vec![older, newer]);
        Ok(())
    }

    #[test]
    fn stale_backups_excludes_current_even_when_old() -> Result<()> {
        let tree = BackupTree::new()?;
        let reference = now();
        let current = tree.backup_hours_before(reference, 300)?;
        let stale = tree.backup_hours_before(reference, 200)?;
        let naming = BackupNaming::new(None)?;

        let cutoff = reference - chrono::Duration::hours(168);
        let found = stale_backups(tree.path(), cutoff, &current, &naming)?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, stale);
        Ok(())
    }
}
