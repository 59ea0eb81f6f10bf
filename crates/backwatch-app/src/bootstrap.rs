use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use backwatch_config::{WatchProfile, load_profile_with};
use backwatch_events::EventBus;
use backwatch_fsops::{BackupNaming, RetentionSweeper};
use backwatch_shrink::ShrinkRunner;
use backwatch_telemetry::{
    DEFAULT_LOG_LEVEL, GlobalContextGuard, LogFormat, LoggingConfig, Metrics, build_sha,
    init_logging,
};
use backwatch_watcher::BackupWatcher;
use tracing::{info, warn};

use crate::confirm::AutoConfirm;
use crate::error::{AppError, AppResult};
use crate::mount::wait_for_mount;
use crate::orchestrator::Orchestrator;

/// Logging knobs read alongside the watch profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Console format.
    pub format: LogFormat,
    /// Optional append-only log file.
    pub file: Option<PathBuf>,
}

/// Dependencies required to run the daemon.
pub struct BootstrapDependencies {
    logging: LogSettings,
    profile: WatchProfile,
    events: EventBus,
    metrics: Metrics,
}

impl BootstrapDependencies {
    /// Build dependencies from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error when the profile is invalid or metrics cannot be registered.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let profile =
            load_profile_with(&lookup).map_err(|err| AppError::config("profile.load", err))?;
        let logging = LogSettings {
            level: lookup("BACKWATCH_LOG_LEVEL")
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            format: LogFormat::from_name(lookup("BACKWATCH_LOG_FORMAT").as_deref()),
            file: lookup("BACKWATCH_LOG_FILE")
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
        };
        let metrics = Metrics::new().map_err(|err| AppError::telemetry("metrics.new", err))?;
        Ok(Self {
            logging,
            profile,
            events: EventBus::new(),
            metrics,
        })
    }

    /// Build dependencies from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when the profile is invalid or metrics cannot be registered.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loaded watch profile.
    #[must_use]
    pub const fn profile(&self) -> &WatchProfile {
        &self.profile
    }

    /// Logging knobs.
    #[must_use]
    pub const fn logging(&self) -> &LogSettings {
        &self.logging
    }

    /// Event bus shared by every component.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }
}

/// Entry point for the daemon boot sequence: runs until Ctrl-C.
///
/// # Errors
///
/// Returns an error if configuration, logging, the mount wait or watcher
/// startup fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    let logging = dependencies.logging().clone();
    init_logging(&LoggingConfig {
        level: &logging.level,
        format: logging.format,
        build_sha: build_sha(),
        log_file: logging.file.as_deref(),
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("watch");

    run_app_with(dependencies, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "ctrl-c handler unavailable; stopping");
        }
    })
    .await
}

/// Boot sequence over injected dependencies; stops when `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the mount wait times out, a root is missing or the
/// watcher cannot attach.
pub async fn run_app_with<S>(dependencies: BootstrapDependencies, shutdown: S) -> AppResult<()>
where
    S: Future<Output = ()>,
{
    let BootstrapDependencies {
        logging: _,
        profile,
        events,
        metrics,
    } = dependencies;
    info!(roots = profile.roots.len(), "backwatch daemon starting");

    if let Some(mount_point) = &profile.mount_point {
        wait_for_mount(mount_point, profile.mount_timeout, profile.mount_interval).await?;
    }
    if let Some(missing) = profile.roots.iter().find(|root| !root.is_dir()) {
        return Err(AppError::MissingRoot {
            path: missing.clone(),
        });
    }

    let naming = BackupNaming::new(profile.prefix.as_deref())
        .map_err(|err| AppError::fsops("naming.new", err))?;
    let runner = ShrinkRunner::new(RetentionSweeper::new(
        naming,
        events.clone(),
        metrics.clone(),
    ));
    let watcher = BackupWatcher::from_profile(&profile, events.clone(), metrics.clone())
        .map_err(|err| AppError::fsops("watcher.new", err))?;
    let orchestrator = Arc::new(Orchestrator::new(
        profile.clone(),
        Arc::new(AutoConfirm::new(profile.confirm_delay)),
        runner,
        events,
        metrics,
    ));

    let worker = orchestrator.spawn();
    let handle = watcher
        .start(&profile.roots)
        .map_err(|err| AppError::watch("watcher.start", err))?;
    info!("backwatch daemon ready");

    shutdown.await;
    info!("shutdown requested");

    let stopped = handle
        .shutdown()
        .await
        .map_err(|err| AppError::watch("watcher.shutdown", err));
    worker.abort();
    if let Err(err) = worker.await
        && !err.is_cancelled()
    {
        warn!(error = %err, "orchestrator task join failed");
    }
    stopped?;
    info!("backwatch daemon stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn logging_settings_come_from_the_lookup() -> anyhow::Result<()> {
        let deps = BootstrapDependencies::from_lookup(lookup(&[
            ("BACKWATCH_ROOTS", "/mnt/a"),
            ("BACKWATCH_LOG_FORMAT", "json"),
            ("BACKWATCH_LOG_FILE", "/var/log/backwatch.log"),
        ]))?;
        assert_eq!(deps.logging().format, LogFormat::Json);
        assert_eq!(
            deps.logging().file.as_deref(),
            Some(std::path::Path::new("/var/log/backwatch.log"))
        );
        assert_eq!(deps.logging().level, DEFAULT_LOG_LEVEL);
        assert_eq!(deps.profile().roots, vec![PathBuf::from("/mnt/a")]);
        Ok(())
    }

    #[test]
    fn missing_roots_variable_is_a_config_error() {
        let result = BootstrapDependencies::from_lookup(lookup(&[]));
        assert!(matches!(result, Err(AppError::Config { .. })));
    }

    #[tokio::test]
    async fn missing_root_is_fatal() -> anyhow::Result<()> {
        let deps = BootstrapDependencies::from_lookup(lookup(&[(
            "BACKWATCH_ROOTS",
            "/nonexistent/backwatch-root",
        )]))?;
        let result = run_app_with(deps, async {}).await;
        assert!(matches!(result, Err(AppError::MissingRoot { .. })));
        Ok(())
    }
}
