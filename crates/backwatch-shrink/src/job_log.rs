//! Per-job log file written next to the image.
//!
//! Lines look like `2024-01-01 12:00:00 - INFO - message`. Debug lines are
//! only written when verbose logging is enabled.

use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::error::{ShrinkError, ShrinkResult};

/// Severity recorded in the job log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobLogLevel {
    /// Command lines, exit codes.
    Debug,
    /// Output lines and progress.
    Info,
    /// Recoverable problems.
    Warning,
    /// Job failures.
    Error,
}

impl JobLogLevel {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// Append-only job log.
pub struct JobLog {
    path: PathBuf,
    file: File,
    verbose: bool,
}

impl JobLog {
    /// Open (or create) the log at `path` for appending.
    ///
    /// # Errors
    ///
    /// Returns [`ShrinkError::JobLog`] when the file cannot be opened.
    pub async fn open(path: &Path, verbose: bool) -> ShrinkResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|source| ShrinkError::JobLog {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            verbose,
        })
    }

    /// Append one record.
    ///
    /// # Errors
    ///
    /// Returns [`ShrinkError::JobLog`] when the write fails.
    pub async fn record(&mut self, level: JobLogLevel, message: &str) -> ShrinkResult<()> {
        if level == JobLogLevel::Debug && !self.verbose {
            return Ok(());
        }
        let line = format!(
            "{} - {} - {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            level.as_str(),
            message
        );
        self.file
            .write_all(line.as_bytes())
            .await
            .map_err(|source| ShrinkError::JobLog {
                path: self.path.clone(),
                source,
            })
    }

    /// Flush buffered data to disk.
    ///
    /// # Errors
    ///
    /// Returns [`ShrinkError::JobLog`] when the flush fails.
    pub async fn flush(&mut self) -> ShrinkResult<()> {
        self.file
            .flush()
            .await
            .map_err(|source| ShrinkError::JobLog {
                path: self.path.clone(),
                source,
            })
    }
}
