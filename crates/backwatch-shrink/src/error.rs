//! Error types for shrink jobs.
//!
//! # Design
//! - Constant messages; context lives in fields.
//! - Exactly one of these reaches a job's error sink per failed job.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for shrink operations.
pub type ShrinkResult<T> = Result<T, ShrinkError>;

/// Errors raised while preparing or supervising a shrink job.
#[derive(Debug, Error)]
pub enum ShrinkError {
    /// The job inputs were unusable.
    #[error("invalid shrink job")]
    InvalidJob {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// The external process could not be started.
    #[error("failed to launch shrink process")]
    Launch {
        /// Program that failed to start.
        program: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Reading process output failed.
    #[error("failed to read shrink output")]
    Stream {
        /// Underlying IO error.
        source: io::Error,
    },
    /// Waiting for the process failed.
    #[error("failed to wait for shrink process")]
    Wait {
        /// Underlying IO error.
        source: io::Error,
    },
    /// The process exited unsuccessfully.
    #[error("shrink process exited unsuccessfully")]
    ExitStatus {
        /// Rendered exit status.
        status: String,
        /// Exit code when the process was not killed by a signal.
        code: Option<i32>,
    },
    /// The job was cancelled before it finished.
    #[error("shrink job cancelled")]
    Cancelled,
    /// The per-job log file could not be written.
    #[error("failed to write job log")]
    JobLog {
        /// Log file path.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The supervising task panicked or was aborted.
    #[error("shrink task failed")]
    Join {
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
}

impl ShrinkError {
    /// One-line description including the underlying cause.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Launch { program, source } => format!("{self} ({program}): {source}"),
            Self::Stream { source } | Self::Wait { source } => format!("{self}: {source}"),
            Self::JobLog { path, source } => format!("{self} ({}): {source}", path.display()),
            Self::ExitStatus { status, .. } => format!("{self}: {status}"),
            Self::InvalidJob { field, reason, .. } => format!("{self}: {field} {reason}"),
            Self::Join { source } => format!("{self}: {source}"),
            Self::Cancelled => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_includes_cause() {
        let err = ShrinkError::Launch {
            program: "sudo".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(err.to_string(), "failed to launch shrink process");
        assert!(err.detail().starts_with("failed to launch shrink process (sudo): "));

        let err = ShrinkError::ExitStatus {
            status: "exit status: 11".into(),
            code: Some(11),
        };
        assert_eq!(
            err.detail(),
            "shrink process exited unsuccessfully: exit status: 11"
        );
    }
}
