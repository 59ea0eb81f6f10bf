//! Settle detection for a claimed backup folder.
//!
//! # Design
//! - Poll for the completion marker, then wait a fixed settle delay.
//! - Optional quiescence guard: images modified within the window delay dispatch.
//! - Every terminal outcome is published on the event bus; nothing is retried.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use backwatch_config::WatchProfile;
use backwatch_events::{Event, EventBus};
use backwatch_telemetry::Metrics;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::discovery::list_images;
use crate::error::{FsOpsError, FsOpsResult};

/// Timing and naming inputs for the settle detector.
#[derive(Debug, Clone)]
pub struct SettleConfig {
    /// Completion marker file name.
    pub marker: String,
    /// Image extension without the dot.
    pub image_extension: String,
    /// Interval between marker polls.
    pub poll_interval: Duration,
    /// Delay after the marker appears.
    pub settle_delay: Duration,
    /// Upper bound on waiting; unbounded when `None`.
    pub max_wait: Option<Duration>,
    /// Required idle window on image files.
    pub quiescence: Option<Duration>,
}

impl From<&WatchProfile> for SettleConfig {
    fn from(profile: &WatchProfile) -> Self {
        Self {
            marker: profile.marker.clone(),
            image_extension: profile.image_extension.clone(),
            poll_interval: profile.poll_interval,
            settle_delay: profile.settle_delay,
            max_wait: profile.max_wait,
            quiescence: profile.quiescence,
        }
    }
}

/// Terminal result of monitoring one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleOutcome {
    /// The folder settled with these images.
    Images(Vec<PathBuf>),
    /// The folder settled without images.
    Empty,
    /// The bound elapsed before the folder settled.
    Abandoned {
        /// Time spent waiting.
        waited: Duration,
    },
    /// Monitoring failed.
    Failed {
        /// Failure description.
        message: String,
    },
}

impl SettleOutcome {
    /// Metric label for the outcome.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Images(_) => "images",
            Self::Empty => "empty",
            Self::Abandoned { .. } => "abandoned",
            Self::Failed { .. } => "failed",
        }
    }
}

enum Wait {
    Ready,
    TimedOut(Duration),
}

/// Watches a single folder until it settles.
#[derive(Clone)]
pub struct SettleDetector {
    config: SettleConfig,
    events: EventBus,
    metrics: Metrics,
}

impl SettleDetector {
    /// Construct a detector publishing on `events`.
    #[must_use]
    pub const fn new(config: SettleConfig, events: EventBus, metrics: Metrics) -> Self {
        Self {
            config,
            events,
            metrics,
        }
    }

    /// Detector configuration.
    #[must_use]
    pub const fn config(&self) -> &SettleConfig {
        &self.config
    }

    /// Monitor `folder` until it settles, is abandoned, or fails.
    pub async fn monitor(&self, folder: &Path) -> SettleOutcome {
        let outcome = match self.settle(folder).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(folder = %folder.display(), error = %err, "settle detection failed");
                SettleOutcome::Failed {
                    message: describe(&err),
                }
            }
        };
        self.metrics.inc_settle_outcome(outcome.label());
        self.publish_outcome(folder, &outcome);
        outcome
    }

    async fn settle(&self, folder: &Path) -> FsOpsResult<SettleOutcome> {
        let started = Instant::now();
        let marker = folder.join(&self.config.marker);

        if let Wait::TimedOut(waited) = self.wait_for_marker(folder, &marker, started).await? {
            return Ok(SettleOutcome::Abandoned { waited });
        }
        debug!(folder = %folder.display(), "completion marker present; settling");
        sleep(self.config.settle_delay).await;

        let mut images = list_images(folder, &self.config.image_extension)?;
        if let Some(window) = self.config.quiescence {
            loop {
                if all_idle(&images, window)? {
                    break;
                }
                if let Some(waited) = self.exceeded(started) {
                    return Ok(SettleOutcome::Abandoned { waited });
                }
                debug!(folder = %folder.display(), "images still changing; waiting");
                sleep(self.bounded(window, started)).await;
                images = list_images(folder, &self.config.image_extension)?;
            }
        }

        if images.is_empty() {
            Ok(SettleOutcome::Empty)
        } else {
            Ok(SettleOutcome::Images(images))
        }
    }

    async fn wait_for_marker(
        &self,
        folder: &Path,
        marker: &Path,
        started: Instant,
    ) -> FsOpsResult<Wait> {
        loop {
            if tokio::fs::try_exists(marker)
                .await
                .map_err(|err| FsOpsError::io("settle.marker", marker, err))?
            {
                return Ok(Wait::Ready);
            }
            let metadata = tokio::fs::metadata(folder)
                .await
                .map_err(|err| FsOpsError::io("settle.folder", folder, err))?;
            if !metadata.is_dir() {
                return Err(FsOpsError::invalid_input(
                    "folder",
                    "not_a_directory",
                    Some(folder.display().to_string()),
                ));
            }
            if let Some(waited) = self.exceeded(started) {
                return Ok(Wait::TimedOut(waited));
            }
            sleep(self.bounded(self.config.poll_interval, started)).await;
        }
    }

    fn bounded(&self, pause: Duration, started: Instant) -> Duration {
        self.config.max_wait.map_or(pause, |limit| {
            pause.min(limit.saturating_sub(started.elapsed()))
        })
    }

    fn exceeded(&self, started: Instant) -> Option<Duration> {
        let waited = started.elapsed();
        self.config
            .max_wait
            .filter(|limit| waited >= *limit)
            .map(|_| waited)
    }

    fn publish_outcome(&self, folder: &Path, outcome: &SettleOutcome) {
        let folder_buf = folder.to_path_buf();
        match outcome {
            SettleOutcome::Images(images) => {
                info!(folder = %folder.display(), count = images.len(), "backup images discovered");
                self.metrics
                    .add_images_discovered(u64::try_from(images.len()).unwrap_or(u64::MAX));
                for image in images {
                    self.publish(Event::ImageDiscovered {
                        folder: folder_buf.clone(),
                        image: image.clone(),
                    });
                }
            }
            SettleOutcome::Empty => {
                warn!(folder = %folder.display(), "backup completed but no images were found");
                self.publish(Event::NoImagesFound { folder: folder_buf });
            }
            SettleOutcome::Abandoned { waited } => {
                warn!(folder = %folder.display(), waited_secs = waited.as_secs(), "backup folder never settled; giving up");
                self.publish(Event::SettleAbandoned {
                    folder: folder_buf,
                    waited_secs: waited.as_secs(),
                });
            }
            SettleOutcome::Failed { message } => {
                self.publish(Event::SettleFailed {
                    folder: folder_buf,
                    message: message.clone(),
                });
            }
        }
    }

    fn publish(&self, event: Event) {
        self.metrics.inc_event(event.kind());
        let _ = self.events.publish(event);
    }
}

fn all_idle(images: &[PathBuf], window: Duration) -> FsOpsResult<bool> {
    let now = SystemTime::now();
    for image in images {
        let modified = std::fs::metadata(image)
            .and_then(|meta| meta.modified())
            .map_err(|err| FsOpsError::io("settle.quiescence", image, err))?;
        let idle = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if idle < window {
            return Ok(false);
        }
    }
    Ok(true)
}

fn describe(err: &FsOpsError) -> String {
    if err.is_not_found() {
        return "backup folder disappeared".to_string();
    }
    match err {
        FsOpsError::Io { operation, source, .. } => format!("{operation}: {source}"),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SettleConfig {
        SettleConfig {
            marker: "raspiBackup.log".into(),
            image_extension: "img".into(),
            poll_interval: Duration::from_millis(10),
            settle_delay: Duration::ZERO,
            max_wait: Some(Duration::from_millis(50)),
            quiescence: None,
        }
    }

    #[tokio::test]
    async fn abandons_when_marker_never_appears() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let detector = SettleDetector::new(config(), EventBus::new(), Metrics::new()?);
        let outcome = detector.monitor(dir.path()).await;
        assert!(matches!(outcome, SettleOutcome::Abandoned { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn vanished_folder_fails() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let missing = dir.path().join("gone");
        let detector = SettleDetector::new(config(), EventBus::new(), Metrics::new()?);
        let outcome = detector.monitor(&missing).await;
        assert_eq!(
            outcome,
            SettleOutcome::Failed {
                message: "backup folder disappeared".into()
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn fresh_images_wait_for_quiescence() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("raspiBackup.log"), b"done")?;
        std::fs::write(dir.path().join("disk.img"), b"data")?;
        let mut cfg = config();
        cfg.quiescence = Some(Duration::from_secs(60));
        cfg.max_wait = Some(Duration::from_millis(20));
        let detector = SettleDetector::new(cfg, EventBus::new(), Metrics::new()?);
        let outcome = detector.monitor(dir.path()).await;
        assert!(matches!(outcome, SettleOutcome::Abandoned { .. }));
        Ok(())
    }
}
