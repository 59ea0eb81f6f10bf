//! Recursive watcher over the backup roots.
//!
//! # Design
//! - notify delivers raw events on its own thread; the callback only forwards
//!   them into an unbounded channel drained by one tokio task.
//! - A folder is claimed in [`WatchState`] before its settle task is spawned,
//!   so the directory trigger and the marker trigger never both dispatch it.
//! - Settle tasks are bounded by a semaphore. A folder that cannot get a
//!   permit is released again and reported.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use backwatch_config::WatchProfile;
use backwatch_events::{DetectionTrigger, Event, EventBus};
use backwatch_fsops::{BackupNaming, SettleConfig, SettleDetector};
use backwatch_telemetry::Metrics;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{WatchError, WatchResult};
use crate::state::WatchState;

/// What `observe` did with a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The folder was claimed and a settle task started.
    Started(PathBuf),
    /// The folder was claimed earlier.
    AlreadyWatching(PathBuf),
    /// The path is not a backup folder or a marker inside one.
    Ignored,
    /// No monitor slot was free; the claim was dropped.
    Rejected(PathBuf),
}

/// Claims new backup folders and runs the settle detector on them.
#[derive(Clone)]
pub struct BackupWatcher {
    naming: BackupNaming,
    marker: String,
    detector: SettleDetector,
    state: WatchState,
    monitors: Arc<Semaphore>,
    events: EventBus,
    metrics: Metrics,
}

impl BackupWatcher {
    /// Construct a watcher from its parts.
    #[must_use]
    pub fn new(
        naming: BackupNaming,
        detector: SettleDetector,
        max_monitors: usize,
        events: EventBus,
        metrics: Metrics,
    ) -> Self {
        Self {
            naming,
            marker: detector.config().marker.clone(),
            detector,
            state: WatchState::new(),
            monitors: Arc::new(Semaphore::new(max_monitors.max(1))),
            events,
            metrics,
        }
    }

    /// Construct a watcher configured by `profile`.
    ///
    /// # Errors
    ///
    /// Returns an error when the profile's prefix does not compile into a
    /// naming pattern.
    pub fn from_profile(
        profile: &WatchProfile,
        events: EventBus,
        metrics: Metrics,
    ) -> backwatch_fsops::FsOpsResult<Self> {
        let naming = BackupNaming::new(profile.prefix.as_deref())?;
        let detector = SettleDetector::new(
            SettleConfig::from(profile),
            events.clone(),
            metrics.clone(),
        );
        Ok(Self::new(
            naming,
            detector,
            profile.max_monitors,
            events,
            metrics,
        ))
    }

    /// Folders claimed so far.
    #[must_use]
    pub const fn watch_state(&self) -> &WatchState {
        &self.state
    }

    /// Route one filesystem path. Must be called inside a tokio runtime.
    pub fn observe(&self, path: &Path, is_dir: bool) -> DispatchOutcome {
        match self.candidate(path, is_dir) {
            Some((folder, trigger)) => self.dispatch(folder, trigger),
            None => DispatchOutcome::Ignored,
        }
    }

    /// Attach to every root and start the event loop.
    ///
    /// # Errors
    ///
    /// Returns an error when a root is missing or notify cannot watch it.
    pub fn start(&self, roots: &[PathBuf]) -> WatchResult<WatchHandle> {
        if roots.is_empty() {
            return Err(WatchError::NoRoots);
        }
        if let Some(missing) = roots.iter().find(|root| !root.is_dir()) {
            return Err(WatchError::MissingRoot {
                path: missing.clone(),
            });
        }

        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                // The loop is gone once the handle is dropped.
                let _ = raw_tx.send(res);
            },
            Config::default(),
        )
        .map_err(|source| WatchError::notify("watcher.create", None, source))?;

        for root in roots {
            watcher
                .watch(root, RecursiveMode::Recursive)
                .map_err(|source| WatchError::notify("watcher.watch", Some(root.clone()), source))?;
            info!(root = %root.display(), "watching backup root");
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(self.clone().pump(raw_rx, shutdown_rx));
        Ok(WatchHandle {
            _watcher: watcher,
            shutdown: Some(shutdown_tx),
            task,
        })
    }

    async fn pump(
        self,
        mut raw: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                received = raw.recv() => match received {
                    Some(Ok(event)) => self.handle(event).await,
                    Some(Err(err)) => {
                        let path = err.paths.first().cloned();
                        self.report(path, &err.to_string());
                    }
                    None => break,
                },
            }
        }
        debug!("watch loop stopped");
    }

    async fn handle(&self, event: notify::Event) {
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return;
        }
        for path in event.paths {
            if !self.is_interesting(&path) {
                continue;
            }
            match tokio::fs::metadata(&path).await {
                Ok(metadata) => {
                    let outcome = self.observe(&path, metadata.is_dir());
                    debug!(path = %path.display(), ?outcome, "filesystem event routed");
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "path vanished before it was inspected");
                }
                Err(err) => self.report(Some(path), &err.to_string()),
            }
        }
    }

    fn is_interesting(&self, path: &Path) -> bool {
        self.naming.matches_path(path)
            || path
                .file_name()
                .is_some_and(|name| name == self.marker.as_str())
    }

    fn candidate(&self, path: &Path, is_dir: bool) -> Option<(PathBuf, DetectionTrigger)> {
        if is_dir {
            return self
                .naming
                .matches_path(path)
                .then(|| (path.to_path_buf(), DetectionTrigger::Directory));
        }
        if path.file_name()? != self.marker.as_str() {
            return None;
        }
        let parent = path.parent()?;
        self.naming
            .matches_path(parent)
            .then(|| (parent.to_path_buf(), DetectionTrigger::Marker))
    }

    fn dispatch(&self, folder: PathBuf, trigger: DetectionTrigger) -> DispatchOutcome {
        if !self.state.claim(&folder) {
            debug!(folder = %folder.display(), "backup folder already claimed");
            return DispatchOutcome::AlreadyWatching(folder);
        }
        let Ok(permit) = Arc::clone(&self.monitors).try_acquire_owned() else {
            self.state.release(&folder);
            warn!(folder = %folder.display(), "monitor capacity exhausted; folder not claimed");
            self.report(Some(folder.clone()), "monitor capacity exhausted");
            return DispatchOutcome::Rejected(folder);
        };

        info!(folder = %folder.display(), trigger = trigger.as_str(), "backup folder detected");
        self.metrics.inc_backup_detected(trigger.as_str());
        self.publish(Event::BackupDetected {
            folder: folder.clone(),
            trigger,
        });

        self.metrics.add_active_monitors(1);
        let detector = self.detector.clone();
        let metrics = self.metrics.clone();
        let monitored = folder.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let outcome = detector.monitor(&monitored).await;
            metrics.add_active_monitors(-1);
            debug!(folder = %monitored.display(), outcome = outcome.label(), "monitor finished");
        });
        DispatchOutcome::Started(folder)
    }

    fn report(&self, path: Option<PathBuf>, message: &str) {
        self.metrics.inc_watch_error();
        self.publish(Event::WatchError {
            path,
            message: message.to_string(),
        });
    }

    fn publish(&self, event: Event) {
        self.metrics.inc_event(event.kind());
        let _ = self.events.publish(event);
    }
}

/// Keeps the notify subscription alive. Dropping it stops watching.
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Stop the event loop and wait for it to exit.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Join`] if the loop panicked.
    pub async fn shutdown(mut self) -> WatchResult<()> {
        if let Some(signal) = self.shutdown.take() {
            let _ = signal.send(());
        }
        self.task
            .await
            .map_err(|source| WatchError::Join { source })
    }

    /// Whether the event loop exited on its own.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
