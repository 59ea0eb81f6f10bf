//! Waiting for the backup mount point before watching starts.

use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};

/// Whether `path` is the root of a mounted filesystem.
///
/// # Errors
///
/// Returns an IO error when `path` or its parent cannot be inspected.
pub fn is_mount_point(path: &Path) -> io::Result<bool> {
    let own = std::fs::metadata(path)?;
    if !own.is_dir() {
        return Ok(false);
    }
    let parent = std::fs::metadata(path.join(".."))?;
    Ok(own.dev() != parent.dev() || own.ino() == parent.ino())
}

/// Poll until `mount_point` is mounted or `timeout` elapses.
///
/// # Errors
///
/// Returns [`AppError::MountTimeout`] when the mount point never appears.
pub async fn wait_for_mount(
    mount_point: &Path,
    timeout: Duration,
    interval: Duration,
) -> AppResult<()> {
    let started = Instant::now();
    loop {
        match is_mount_point(mount_point) {
            Ok(true) => {
                info!(mount_point = %mount_point.display(), "backup mount point available");
                return Ok(());
            }
            Ok(false) => debug!(mount_point = %mount_point.display(), "not mounted yet"),
            Err(err) => debug!(mount_point = %mount_point.display(), error = %err, "mount point not inspectable yet"),
        }
        let waited = started.elapsed();
        if waited >= timeout {
            return Err(AppError::MountTimeout {
                path: mount_point.to_path_buf(),
                waited_secs: waited.as_secs(),
            });
        }
        sleep(interval.min(timeout.saturating_sub(waited))).await;
    }
}
