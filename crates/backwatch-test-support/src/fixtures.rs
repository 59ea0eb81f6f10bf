//! Builders for on-disk backup trees.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDateTime, Timelike};
use tempfile::TempDir;

/// Prefix used by fixture folders.
pub const PREFIX: &str = "raspihaupt";
/// Marker file name used by fixture folders.
pub const MARKER: &str = "raspiBackup.log";

/// Render a backup folder name for `created_at`.
#[must_use]
pub fn folder_name(prefix: &str, created_at: NaiveDateTime) -> String {
    format!(
        "{prefix}-dd-backup-{}",
        created_at.format("%Y%m%d-%H%M%S")
    )
}

/// Current local time truncated to whole seconds.
#[must_use]
pub fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Temporary backup root populated with dd-style backup folders.
pub struct BackupTree {
    root: TempDir,
}

impl BackupTree {
    /// Create an empty backup root.
    ///
    /// # Errors
    ///
    /// Returns an error when the temporary directory cannot be created.
    pub fn new() -> Result<Self> {
        let root = tempfile::Builder::new()
            .prefix("backwatch-")
            .tempdir()
            .context("failed to create backup root")?;
        Ok(Self { root })
    }

    /// Root directory of the tree.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Create a backup folder stamped `created_at`.
    ///
    /// # Errors
    ///
    /// Returns an error when the folder cannot be created.
    pub fn backup_at(&self, created_at: NaiveDateTime) -> Result<PathBuf> {
        let folder = self.root.path().join(folder_name(PREFIX, created_at));
        fs::create_dir_all(&folder)
            .with_context(|| format!("failed to create {}", folder.display()))?;
        Ok(folder)
    }

    /// Create a backup folder stamped `hours` before `reference`.
    ///
    /// # Errors
    ///
    /// Returns an error when the folder cannot be created.
    pub fn backup_hours_before(&self, reference: NaiveDateTime, hours: i64) -> Result<PathBuf> {
        self.backup_at(reference - Duration::hours(hours))
    }

    /// Create an arbitrary directory under the root.
    ///
    /// # Errors
    ///
    /// Returns an error when the folder cannot be created.
    pub fn plain_dir(&self, name: &str) -> Result<PathBuf> {
        let folder = self.root.path().join(name);
        fs::create_dir_all(&folder)?;
        Ok(folder)
    }
}

/// Write the completion marker into `folder`.
///
/// # Errors
///
/// Returns an error when the file cannot be written.
pub fn write_marker(folder: &Path) -> Result<PathBuf> {
    let marker = folder.join(MARKER);
    fs::write(&marker, b"backup finished\n")?;
    Ok(marker)
}

/// Write an image artifact named `name` into `folder`.
///
/// # Errors
///
/// Returns an error when the file cannot be written.
pub fn write_image(folder: &Path, name: &str) -> Result<PathBuf> {
    let image = folder.join(name);
    fs::write(&image, vec![0_u8; 512])?;
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn folder_name_encodes_timestamp() {
        let created = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(7, 5, 1))
            .expect("valid timestamp");
        assert_eq!(
            folder_name("raspihaupt", created),
            "raspihaupt-dd-backup-20240309-070501"
        );
    }

    #[test]
    fn tree_builds_folders_with_marker_and_image() -> Result<()> {
        let tree = BackupTree::new()?;
        let folder = tree.backup_hours_before(now(), 2)?;
        write_marker(&folder)?;
        write_image(&folder, "disk.img")?;
        assert!(folder.join(MARKER).is_file());
        assert!(folder.join("disk.img").is_file());
        Ok(())
    }
}
