//! Event payload types carried between the watcher, the shrink runner and
//! any subscriber (CLI, future UI).

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identifier assigned to each event emitted on the bus.
pub type EventId = u64;

/// Identifier of a shrink job.
pub type JobId = Uuid;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// What caused a backup folder to be claimed.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DetectionTrigger {
    /// The backup directory itself appeared.
    Directory,
    /// The completion marker appeared inside a backup directory.
    Marker,
}

impl DetectionTrigger {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::Marker => "marker",
        }
    }
}

/// Typed domain events.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A backup folder was claimed and handed to the settle detector.
    BackupDetected {
        /// Claimed folder.
        folder: PathBuf,
        /// Filesystem event that caused the claim.
        trigger: DetectionTrigger,
    },
    /// A settled folder contained an image artifact.
    ImageDiscovered {
        /// Owning backup folder.
        folder: PathBuf,
        /// Image artifact path.
        image: PathBuf,
    },
    /// The marker appeared but the folder held no images.
    NoImagesFound {
        /// Folder that settled empty.
        folder: PathBuf,
    },
    /// The marker never appeared within the configured bound.
    SettleAbandoned {
        /// Folder that was being monitored.
        folder: PathBuf,
        /// Seconds spent waiting.
        waited_secs: u64,
    },
    /// Monitoring a folder failed (vanished, unreadable).
    SettleFailed {
        /// Folder that was being monitored.
        folder: PathBuf,
        /// Failure description.
        message: String,
    },
    /// Handling a filesystem notification failed.
    WatchError {
        /// Path involved, when known.
        path: Option<PathBuf>,
        /// Failure description.
        message: String,
    },
    /// A shrink job started.
    ShrinkStarted {
        /// Job identifier.
        job_id: JobId,
        /// Image being shrunk.
        image: PathBuf,
        /// Display form of the invoked command.
        command: String,
    },
    /// One line of merged stdout/stderr output.
    ShrinkOutput {
        /// Job identifier.
        job_id: JobId,
        /// Output line without the trailing newline.
        line: String,
    },
    /// A shrink job exited successfully.
    ShrinkCompleted {
        /// Job identifier.
        job_id: JobId,
        /// Image that was shrunk.
        image: PathBuf,
        /// Rendered exit status.
        status: String,
    },
    /// A shrink job failed to launch, stream or exit cleanly.
    ShrinkFailed {
        /// Job identifier.
        job_id: JobId,
        /// Image that was being shrunk.
        image: PathBuf,
        /// Failure description.
        message: String,
    },
    /// A retention sweep finished.
    RetentionCompleted {
        /// Folder that was excluded from the sweep.
        current: PathBuf,
        /// Folders deleted.
        deleted: Vec<PathBuf>,
        /// Count of folders that could not be deleted.
        failed: usize,
    },
    /// A single folder could not be deleted during a sweep.
    RetentionFailed {
        /// Folder that survived.
        folder: PathBuf,
        /// Failure description.
        message: String,
    },
}

impl Event {
    /// Machine-friendly discriminator.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BackupDetected { .. } => "backup_detected",
            Self::ImageDiscovered { .. } => "image_discovered",
            Self::NoImagesFound { .. } => "no_images_found",
            Self::SettleAbandoned { .. } => "settle_abandoned",
            Self::SettleFailed { .. } => "settle_failed",
            Self::WatchError { .. } => "watch_error",
            Self::ShrinkStarted { .. } => "shrink_started",
            Self::ShrinkOutput { .. } => "shrink_output",
            Self::ShrinkCompleted { .. } => "shrink_completed",
            Self::ShrinkFailed { .. } => "shrink_failed",
            Self::RetentionCompleted { .. } => "retention_completed",
            Self::RetentionFailed { .. } => "retention_failed",
        }
    }

    /// Job the event belongs to, if any.
    #[must_use]
    pub const fn job_id(&self) -> Option<JobId> {
        match self {
            Self::ShrinkStarted { job_id, .. }
            | Self::ShrinkOutput { job_id, .. }
            | Self::ShrinkCompleted { job_id, .. }
            | Self::ShrinkFailed { job_id, .. } => Some(*job_id),
            _ => None,
        }
    }
}

/// Metadata wrapper around events.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Monotonic identifier assigned to the wrapped event.
    pub id: EventId,
    /// Timestamp recording when the envelope was produced.
    pub timestamp: DateTime<Utc>,
    /// Wrapped event payload.
    pub event: Event,
}
