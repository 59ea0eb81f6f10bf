//! Default values for the watch profile and saved settings.
//!
//! # Design
//! - Centralize defaults so the loader, the CLI and tests agree.
//! - Keep time-based defaults explicit for auditability.

/// Sentinel written by raspiBackup once a backup run is complete.
pub const MARKER_FILE_NAME: &str = "raspiBackup.log";
/// Extension (without the dot) of the image artifacts produced by a backup.
pub const IMAGE_EXTENSION: &str = "img";
/// Per-job log written next to the image when logging is enabled.
pub const JOB_LOG_NAME: &str = "shrink.log";
/// Settings document used when no explicit path is configured.
pub const SETTINGS_FILE_NAME: &str = "settings.json";
/// Shrink script invoked when no explicit path is configured.
pub const SHRINK_SCRIPT: &str = "pishrink.sh";
/// Interpreter used to run the shrink script.
pub const INTERPRETER: &str = "bash";
/// Elevation wrapper prefixed to the shrink invocation.
pub const ELEVATION: &str = "sudo";

/// Seconds between polls for the completion marker.
pub const POLL_INTERVAL_SECS: u64 = 5;
/// Seconds to wait after the marker appears before trusting the folder.
pub const SETTLE_DELAY_SECS: u64 = 10;
/// Maximum number of folders monitored concurrently.
pub const MAX_MONITORS: usize = 16;
/// Seconds before a discovered image is shrunk automatically.
pub const CONFIRM_DELAY_SECS: u64 = 30;
/// Seconds to wait for the backup mount point to appear.
pub const MOUNT_TIMEOUT_SECS: u64 = 60;
/// Seconds between mount point checks.
pub const MOUNT_INTERVAL_SECS: u64 = 2;

/// Default retention age (seven days).
pub const DELETE_HOURS: u32 = 168;
