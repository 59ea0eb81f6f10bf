//! Confirmation step between image discovery and the shrink job.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use backwatch_config::ShrinkSettings;
use tokio::time::{Instant, interval_at};
use tracing::{debug, info};

/// Answer to a confirmation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Run the job with these settings.
    Start(ShrinkSettings),
    /// Leave the image alone.
    Skip,
}

/// Decides whether a discovered image is shrunk and with which settings.
#[async_trait]
pub trait JobConfirmation: Send + Sync {
    /// Confirm the shrink of `image`; `settings` are the saved defaults.
    async fn confirm(&self, image: &Path, settings: &ShrinkSettings) -> Decision;
}

/// Starts every job with the saved settings after a countdown.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm {
    delay: Duration,
}

impl AutoConfirm {
    /// Countdown of `delay` before each job.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl JobConfirmation for AutoConfirm {
    async fn confirm(&self, image: &Path, settings: &ShrinkSettings) -> Decision {
        info!(
            image = %image.display(),
            delay_secs = self.delay.as_secs(),
            "shrink starts automatically after countdown"
        );
        let deadline = Instant::now() + self.delay;
        let tick = Duration::from_secs(1);
        let mut ticker = interval_at(Instant::now() + tick, tick);
        while Instant::now() < deadline {
            tokio::select! {
                _ = ticker.tick() => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    debug!(image = %image.display(), remaining_secs = remaining.as_secs(), "countdown");
                }
                () = tokio::time::sleep_until(deadline) => break,
            }
        }
        Decision::Start(settings.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backwatch_config::ShrinkFlag;

    #[tokio::test]
    async fn countdown_starts_with_saved_settings() {
        let mut settings = ShrinkSettings::default();
        settings.options.enable(ShrinkFlag::Compress);
        let confirm = AutoConfirm::new(Duration::from_millis(50));
        let started = Instant::now();
        let decision = confirm.confirm(Path::new("/b/x/disk.img"), &settings).await;
        assert_eq!(decision, Decision::Start(settings));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn zero_delay_starts_immediately() {
        let confirm = AutoConfirm::new(Duration::ZERO);
        let decision = confirm
            .confirm(Path::new("/b/x/disk.img"), &ShrinkSettings::default())
            .await;
        assert!(matches!(decision, Decision::Start(_)));
    }
}
