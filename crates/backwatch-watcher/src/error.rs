//! # Design
//!
//! - Constant-message errors for watcher setup; per-event failures are
//!   published as events instead of being returned.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for watcher operations.
pub type WatchResult<T> = Result<T, WatchError>;

/// Errors produced while attaching or stopping the filesystem watcher.
#[derive(Debug, Error)]
pub enum WatchError {
    /// A configured root does not exist or is not a directory.
    #[error("watch root missing")]
    MissingRoot {
        /// Root that could not be found.
        path: PathBuf,
    },
    /// No roots were supplied.
    #[error("no watch roots configured")]
    NoRoots,
    /// The notify backend failed.
    #[error("filesystem notification failure")]
    Notify {
        /// Operation that failed.
        operation: &'static str,
        /// Path involved, when known.
        path: Option<PathBuf>,
        /// Underlying notify error.
        source: notify::Error,
    },
    /// The event loop task panicked or was aborted.
    #[error("watch task failed")]
    Join {
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
}

impl WatchError {
    pub(crate) const fn notify(
        operation: &'static str,
        path: Option<PathBuf>,
        source: notify::Error,
    ) -> Self {
        Self::Notify {
            operation,
            path,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_stay_constant() {
        let err = WatchError::MissingRoot {
            path: PathBuf::from("/mnt/missing"),
        };
        assert_eq!(err.to_string(), "watch root missing");
        assert!(matches!(
            WatchError::notify("watch", None, notify::Error::generic("boom")),
            WatchError::Notify {
                operation: "watch",
                path: None,
                ..
            }
        ));
    }
}
