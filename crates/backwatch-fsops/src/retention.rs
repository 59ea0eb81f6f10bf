//! Retention sweep: delete sibling backups older than the configured age.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use backwatch_events::{Event, EventBus};
use backwatch_telemetry::Metrics;
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::active::ActiveFolders;
use crate::discovery::{is_same_folder, scan_backups};
use crate::error::{FsOpsError, FsOpsResult};
use crate::naming::BackupNaming;

/// Folder that survived a sweep because deletion failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
    /// Folder that could not be deleted.
    pub path: PathBuf,
    /// Failure description.
    pub message: String,
}

/// Outcome of a retention sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Folders deleted, oldest first.
    pub deleted: Vec<PathBuf>,
    /// Folders that could not be deleted.
    pub failed: Vec<SweepFailure>,
    /// Backup folders kept (current folder or younger than the cutoff).
    pub skipped: usize,
    /// Bytes reclaimed by deleted folders (best effort).
    pub freed_bytes: u64,
}

impl SweepReport {
    /// Whether the sweep found nothing to delete.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.deleted.is_empty() && self.failed.is_empty()
    }
}

/// Deletes stale sibling backup folders.
#[derive(Clone)]
pub struct RetentionSweeper {
    naming: BackupNaming,
    events: EventBus,
    metrics: Metrics,
    active: ActiveFolders,
    dry_run: bool,
}

impl RetentionSweeper {
    /// Construct a sweeper.
    #[must_use]
    pub fn new(naming: BackupNaming, events: EventBus, metrics: Metrics) -> Self {
        Self {
            naming,
            events,
            metrics,
            active: ActiveFolders::new(),
            dry_run: false,
        }
    }

    /// Folders with a job in flight; the sweep never deletes them.
    /// Clones of this sweeper share the same set.
    #[must_use]
    pub const fn active_folders(&self) -> &ActiveFolders {
        &self.active
    }

    /// Report what would be deleted without deleting anything.
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Delete siblings of `current` older than `now - max_age`.
    ///
    /// The folder `current` and every folder in [`Self::active_folders`]
    /// are never deleted.
    ///
    /// # Errors
    ///
    /// Returns an error when `current` has no parent, the age is out of range,
    /// or the parent cannot be listed. Per-folder deletion failures are
    /// recorded in the report instead.
    pub fn sweep(
        &self,
        current: &Path,
        max_age: Duration,
        now: NaiveDateTime,
    ) -> FsOpsResult<SweepReport> {
        let parent = current
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .ok_or_else(|| {
                FsOpsError::invalid_input(
                    "current_folder",
                    "no_parent",
                    Some(current.display().to_string()),
                )
            })?;
        let age = chrono::Duration::from_std(max_age).map_err(|_| {
            FsOpsError::invalid_input("max_age", "out_of_range", Some(format!("{max_age:?}")))
        })?;
        let cutoff = now - age;

        let mut report = SweepReport::default();
        for entry in scan_backups(parent, &self.naming)? {
            if is_same_folder(&entry.path, current) || entry.created_at >= cutoff {
                report.skipped += 1;
                continue;
            }
            if self.active.contains(&entry.path) {
                debug!(folder = %entry.path.display(), "old backup has a job running; kept");
                report.skipped += 1;
                continue;
            }
            if self.dry_run {
                report.freed_bytes = report.freed_bytes.saturating_add(folder_size(&entry.path));
                report.deleted.push(entry.path);
                continue;
            }
            self.delete(entry.path, &mut report);
        }

        if report.is_noop() {
            info!(parent = %parent.display(), %cutoff, "no backups older than the retention age");
        } else {
            info!(
                parent = %parent.display(),
                deleted = report.deleted.len(),
                failed = report.failed.len(),
                freed_bytes = report.freed_bytes,
                dry_run = self.dry_run,
                "retention sweep completed"
            );
        }

        if !self.dry_run {
            self.metrics.record_retention(
                u64::try_from(report.deleted.len()).unwrap_or(u64::MAX),
                u64::try_from(report.failed.len()).unwrap_or(u64::MAX),
            );
            self.publish(Event::RetentionCompleted {
                current: current.to_path_buf(),
                deleted: report.deleted.clone(),
                failed: report.failed.len(),
            });
        }
        Ok(report)
    }

    fn delete(&self, path: PathBuf, report: &mut SweepReport) {
        let size = folder_size(&path);
        match fs::remove_dir_all(&path) {
            Ok(()) => {
                info!(folder = %path.display(), "deleted old backup");
                report.freed_bytes = report.freed_bytes.saturating_add(size);
                report.deleted.push(path);
            }
            Err(err) => {
                let err = FsOpsError::io("retention.remove", &path, err);
                warn!(folder = %path.display(), error = %err, "failed to delete old backup");
                let message = match &err {
                    FsOpsError::Io { source, .. } => source.to_string(),
                    other => other.to_string(),
                };
                self.publish(Event::RetentionFailed {
                    folder: path.clone(),
                    message: message.clone(),
                });
                report.failed.push(SweepFailure { path, message });
            }
        }
    }

    fn publish(&self, event: Event) {
        self.metrics.inc_event(event.kind());
        let _ = self.events.publish(event);
    }
}

fn folder_size(path: &Path) -> u64 {
    measure(path).unwrap_or_else(|err| {
        debug!(folder = %path.display(), error = %err, "could not measure backup size");
        0
    })
}

fn measure(path: &Path) -> FsOpsResult<u64> {
    let mut total = 0_u64;
    for entry in WalkDir::new(path) {
        let entry = entry.map_err(|err| FsOpsError::walkdir("retention.size", path, err))?;
        if entry.file_type().is_file() {
            let len = entry
                .metadata()
                .map_err(|err| FsOpsError::walkdir("retention.size", entry.path(), err))?
                .len();
            total = total.saturating_add(len);
        }
    }
    Ok(total)
}
