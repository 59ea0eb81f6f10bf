//! # Design
//!
//! - Centralize daemon-level errors for bootstrap and job orchestration.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: backwatch_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: backwatch_telemetry::TelemetryError,
    },
    /// Backup folder operations failed.
    #[error("backup folder operation failed")]
    FsOps {
        /// Operation identifier.
        operation: &'static str,
        /// Source fsops error.
        source: backwatch_fsops::FsOpsError,
    },
    /// Shrink job operations failed.
    #[error("shrink job failed")]
    Shrink {
        /// Operation identifier.
        operation: &'static str,
        /// Source shrink error.
        source: backwatch_shrink::ShrinkError,
    },
    /// Filesystem watching failed.
    #[error("filesystem watch failed")]
    Watch {
        /// Operation identifier.
        operation: &'static str,
        /// Source watch error.
        source: backwatch_watcher::WatchError,
    },
    /// A configured backup root does not exist.
    #[error("backup root missing")]
    MissingRoot {
        /// Root that was not found.
        path: PathBuf,
    },
    /// The backup mount point did not appear in time.
    #[error("mount point not available")]
    MountTimeout {
        /// Mount point that was awaited.
        path: PathBuf,
        /// Seconds spent waiting.
        waited_secs: u64,
    },
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Optional path involved in the failure.
        path: Option<PathBuf>,
        /// Source IO error.
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: backwatch_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: backwatch_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn fsops(
        operation: &'static str,
        source: backwatch_fsops::FsOpsError,
    ) -> Self {
        Self::FsOps { operation, source }
    }

    pub(crate) const fn shrink(
        operation: &'static str,
        source: backwatch_shrink::ShrinkError,
    ) -> Self {
        Self::Shrink { operation, source }
    }

    pub(crate) const fn watch(
        operation: &'static str,
        source: backwatch_watcher::WatchError,
    ) -> Self {
        Self::Watch { operation, source }
    }

    /// Exit code used by the daemon when this error ends the process.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config { .. } => 2,
            Self::MissingRoot { .. } | Self::MountTimeout { .. } => 3,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_error_helpers_build_variants() {
        let config = AppError::config(
            "profile.load",
            backwatch_config::ConfigError::MissingEnv {
                name: "BACKWATCH_ROOTS",
            },
        );
        assert!(matches!(config, AppError::Config { .. }));
        assert_eq!(config.exit_code(), 2);

        let shrink = AppError::shrink("job.run", backwatch_shrink::ShrinkError::Cancelled);
        assert!(matches!(
            shrink,
            AppError::Shrink {
                operation: "job.run",
                ..
            }
        ));
        assert_eq!(shrink.exit_code(), 1);

        let watch = AppError::watch("watcher.start", backwatch_watcher::WatchError::NoRoots);
        assert_eq!(watch.to_string(), "filesystem watch failed");

        let missing = AppError::MissingRoot {
            path: PathBuf::from("/mnt/backups"),
        };
        assert_eq!(missing.exit_code(), 3);
    }
}
