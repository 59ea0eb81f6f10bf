//! Turns discovered images into confirmed shrink jobs.
//!
//! # Design
//! - One task consumes the event bus; every `ImageDiscovered` gets its own
//!   task so a countdown or a running job never delays the next image.
//! - Settings are read from the store when the image is confirmed, so edits
//!   made through the CLI apply to the next job.

use std::path::Path;
use std::sync::Arc;

use backwatch_config::{SettingsStore, ShrinkSettings, WatchProfile};
use backwatch_events::{Event, EventBus};
use backwatch_fsops::{format_bytes, free_bytes};
use backwatch_shrink::{EventSink, JobReport, ShrinkJob, ShrinkRunner};
use backwatch_telemetry::Metrics;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::confirm::{Decision, JobConfirmation};
use crate::error::{AppError, AppResult};

/// Reacts to image discoveries by confirming and running shrink jobs.
pub struct Orchestrator {
    profile: WatchProfile,
    store: SettingsStore,
    confirmation: Arc<dyn JobConfirmation>,
    runner: ShrinkRunner,
    events: EventBus,
    metrics: Metrics,
}

impl Orchestrator {
    /// Construct an orchestrator from shared dependencies.
    #[must_use]
    pub fn new(
        profile: WatchProfile,
        confirmation: Arc<dyn JobConfirmation>,
        runner: ShrinkRunner,
        events: EventBus,
        metrics: Metrics,
    ) -> Self {
        let store = SettingsStore::new(profile.settings_path.clone());
        Self {
            profile,
            store,
            confirmation,
            runner,
            events,
            metrics,
        }
    }

    /// Confirm and shrink one image. Returns `None` when the job was skipped.
    ///
    /// # Errors
    ///
    /// Returns an error when the job cannot be described or the shrink fails.
    pub async fn process_image(&self, image: &Path) -> AppResult<Option<JobReport>> {
        let saved = self.load_settings();
        let settings = match self.confirmation.confirm(image, &saved).await {
            Decision::Start(settings) => settings,
            Decision::Skip => {
                info!(image = %image.display(), "shrink skipped");
                return Ok(None);
            }
        };

        let job = ShrinkJob::new(image, settings, &self.profile)
            .map_err(|err| AppError::shrink("job.new", err))?;
        report_free_space(job.folder());

        let sink = EventSink::new(self.events.clone(), self.metrics.clone());
        self.runner
            .run(&job, &sink)
            .await
            .map(Some)
            .map_err(|err| AppError::shrink("job.run", err))
    }

    /// Spawn the task that reacts to `ImageDiscovered` events.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        let mut stream = self.events.subscribe();
        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(envelope) => {
                        if let Event::ImageDiscovered { image, .. } = envelope.event {
                            orchestrator.spawn_job(image);
                        }
                    }
                    Err(err) => warn!(error = %err, "orchestrator lagged behind the event bus"),
                }
            }
            debug!("orchestrator event stream closed");
        })
    }

    fn spawn_job(self: &Arc<Self>, image: std::path::PathBuf) {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            match orchestrator.process_image(&image).await {
                Ok(Some(report)) => {
                    info!(image = %image.display(), status = %report.status, "image shrunk");
                }
                Ok(None) => {}
                Err(err) => {
                    error!(image = %image.display(), error = %err, "shrink job did not complete");
                }
            }
        });
    }

    fn load_settings(&self) -> ShrinkSettings {
        match self.store.load() {
            Ok(settings) => settings,
            Err(err) => {
                warn!(
                    path = %self.store.path().display(),
                    error = %err,
                    "saved settings unreadable; using defaults"
                );
                ShrinkSettings::default()
            }
        }
    }
}

fn report_free_space(folder: &Path) {
    match free_bytes(folder) {
        Ok(bytes) => info!(
            folder = %folder.display(),
            free = %format_bytes(bytes),
            "free space before shrink"
        ),
        Err(err) => debug!(folder = %folder.display(), error = %err, "free space unavailable"),
    }
}
