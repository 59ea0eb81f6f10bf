//! Process supervision for shrink jobs.
//!
//! # Design
//! - stdout and stderr are merged into one line stream; reading never blocks
//!   the caller because jobs run on their own task.
//! - The job's folder is marked busy for the whole run, so a sweep started
//!   by any other job leaves it alone.
//! - A job fails at most once: launch, streaming, wait, non-zero exit or
//!   cancellation each end the job with a single `JobSink::error` call.
//! - Retention runs only after a successful exit and never touches a folder
//!   with a job in flight.

use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use backwatch_events::JobId;
use backwatch_fsops::{ActiveFolders, RetentionSweeper, SweepReport};
use chrono::Local;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::error::{ShrinkError, ShrinkResult};
use crate::job::ShrinkJob;
use crate::job_log::{JobLog, JobLogLevel};
use crate::lines::forward_lines;
use crate::sink::JobSink;

/// Prefix of the line emitted after a successful exit.
pub const COMPLETION_PREFIX: &str = "shrink finished: ";

const LINE_BUFFER: usize = 256;

/// Summary of a successful job.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    /// Job identifier.
    pub job_id: JobId,
    /// Image that was shrunk.
    pub image: PathBuf,
    /// Rendered exit status.
    pub status: String,
    /// Output lines received from the process.
    pub lines: usize,
    /// Retention outcome when a sweep ran.
    pub sweep: Option<SweepReport>,
}

enum Step {
    Line(Option<io::Result<String>>),
    Cancel,
    CancelGone,
}

/// Runs shrink jobs and the retention sweep that follows them.
#[derive(Clone)]
pub struct ShrinkRunner {
    sweeper: RetentionSweeper,
}

impl ShrinkRunner {
    /// Construct a runner that sweeps with `sweeper`.
    #[must_use]
    pub const fn new(sweeper: RetentionSweeper) -> Self {
        Self { sweeper }
    }

    /// Folders with a job of this runner (or any clone) in flight.
    #[must_use]
    pub const fn active_folders(&self) -> &ActiveFolders {
        self.sweeper.active_folders()
    }

    /// Run `job` to completion on the current task.
    ///
    /// # Errors
    ///
    /// Returns the same error that was reported to `sink`.
    pub async fn run(&self, job: &ShrinkJob, sink: &dyn JobSink) -> ShrinkResult<JobReport> {
        self.execute(job, sink, None).await
    }

    /// Run `job` on its own task, keeping the ability to cancel it.
    #[must_use]
    pub fn spawn(&self, job: ShrinkJob, sink: Arc<dyn JobSink>) -> JobHandle {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let runner = self.clone();
        let job_id = job.id();
        let task =
            tokio::spawn(async move { runner.execute(&job, sink.as_ref(), Some(cancel_rx)).await });
        JobHandle {
            job_id,
            cancel: Some(cancel_tx),
            task,
        }
    }

    async fn execute(
        &self,
        job: &ShrinkJob,
        sink: &dyn JobSink,
        cancel: Option<oneshot::Receiver<()>>,
    ) -> ShrinkResult<JobReport> {
        let _busy = self.sweeper.active_folders().hold(job.folder());
        let mut log = open_log(job).await;
        sink.started(job);
        info!(
            job_id = %job.id(),
            image = %job.image().display(),
            command = %job.command(),
            "starting shrink job"
        );
        note(&mut log, JobLogLevel::Debug, &format!("command: {}", job.command())).await;
        note(
            &mut log,
            JobLogLevel::Info,
            &format!("shrinking {}", job.image().display()),
        )
        .await;

        let (status, lines) = match supervise(job, sink, &mut log, cancel).await {
            Ok(done) => done,
            Err(err) => {
                warn!(job_id = %job.id(), error = %err, detail = %err.detail(), "shrink job failed");
                note(&mut log, JobLogLevel::Error, &err.detail()).await;
                close(&mut log).await;
                sink.error(job, &err);
                return Err(err);
            }
        };

        let completion = format!("{COMPLETION_PREFIX}{status}");
        info!(job_id = %job.id(), %status, "shrink job finished");
        sink.output(job, &completion);
        note(&mut log, JobLogLevel::Info, &completion).await;

        let sweep = match job.settings().retention() {
            Some(max_age) => self.sweep(job, max_age, &mut log).await,
            None => None,
        };

        let report = JobReport {
            job_id: job.id(),
            image: job.image().to_path_buf(),
            status: status.to_string(),
            lines,
            sweep,
        };
        close(&mut log).await;
        sink.finished(job, &report);
        Ok(report)
    }

    async fn sweep(
        &self,
        job: &ShrinkJob,
        max_age: Duration,
        log: &mut Option<JobLog>,
    ) -> Option<SweepReport> {
        let sweeper = self.sweeper.clone();
        let folder = job.folder().to_path_buf();
        let now = Local::now().naive_local();
        let outcome =
            tokio::task::spawn_blocking(move || sweeper.sweep(&folder, max_age, now)).await;
        match outcome {
            Ok(Ok(report)) => {
                let summary = if report.is_noop() {
                    "retention: no old backups to delete".to_string()
                } else {
                    format!(
                        "retention: deleted {} old backup(s), {} failed",
                        report.deleted.len(),
                        report.failed.len()
                    )
                };
                note(log, JobLogLevel::Info, &summary).await;
                for failure in &report.failed {
                    let message = format!(
                        "retention: could not delete {}: {}",
                        failure.path.display(),
                        failure.message
                    );
                    note(log, JobLogLevel::Warning, &message).await;
                }
                Some(report)
            }
            Ok(Err(err)) => {
                warn!(job_id = %job.id(), error = %err, "retention sweep failed");
                note(log, JobLogLevel::Warning, &format!("retention failed: {err}")).await;
                None
            }
            Err(err) => {
                warn!(job_id = %job.id(), error = %err, "retention task failed");
                None
            }
        }
    }
}

async fn supervise(
    job: &ShrinkJob,
    sink: &dyn JobSink,
    log: &mut Option<JobLog>,
    mut cancel: Option<oneshot::Receiver<()>>,
) -> ShrinkResult<(ExitStatus, usize)> {
    let mut command = job.command().to_tokio();
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    let mut child = command.spawn().map_err(|source| ShrinkError::Launch {
        program: job.command().program().to_string_lossy().into_owned(),
        source,
    })?;

    let stdout = child.stdout.take().ok_or_else(|| ShrinkError::Stream {
        source: io::Error::other("stdout was not captured"),
    })?;
    let stderr = child.stderr.take().ok_or_else(|| ShrinkError::Stream {
        source: io::Error::other("stderr was not captured"),
    })?;
    let (line_tx, line_rx) = mpsc::channel(LINE_BUFFER);
    tokio::spawn(forward_lines(stdout, line_tx.clone()));
    tokio::spawn(forward_lines(stderr, line_tx));
    let mut lines = ReceiverStream::new(line_rx);

    let mut count = 0_usize;
    loop {
        let step = match cancel.as_mut() {
            Some(signal) => tokio::select! {
                line = lines.next() => Step::Line(line),
                received = signal => if received.is_ok() { Step::Cancel } else { Step::CancelGone },
            },
            None => Step::Line(lines.next().await),
        };
        match step {
            Step::Line(Some(Ok(line))) => {
                count += 1;
                sink.output(job, &line);
                note(log, JobLogLevel::Info, &line).await;
            }
            Step::Line(Some(Err(source))) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(ShrinkError::Stream { source });
            }
            Step::Line(None) => break,
            Step::Cancel => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(ShrinkError::Cancelled);
            }
            Step::CancelGone => cancel = None,
        }
    }

    let status = child
        .wait()
        .await
        .map_err(|source| ShrinkError::Wait { source })?;
    note(log, JobLogLevel::Debug, &format!("exit status: {status}")).await;
    if !status.success() {
        return Err(ShrinkError::ExitStatus {
            status: status.to_string(),
            code: status.code(),
        });
    }
    Ok((status, count))
}

async fn open_log(job: &ShrinkJob) -> Option<JobLog> {
    let settings = job.settings();
    if !settings.logging_enabled {
        return None;
    }
    match JobLog::open(job.job_log_path(), settings.advanced_logging).await {
        Ok(log) => Some(log),
        Err(err) => {
            warn!(path = %job.job_log_path().display(), error = %err, "job log unavailable");
            None
        }
    }
}

async fn note(log: &mut Option<JobLog>, level: JobLogLevel, message: &str) {
    let Some(active) = log.as_mut() else {
        return;
    };
    if let Err(err) = active.record(level, message).await {
        warn!(error = %err, "job log write failed; disabling job log");
        *log = None;
    }
}

async fn close(log: &mut Option<JobLog>) {
    if let Some(mut active) = log.take()
        && let Err(err) = active.flush().await
    {
        warn!(error = %err, "job log flush failed");
    }
}

/// Handle to a job running on its own task.
pub struct JobHandle {
    job_id: JobId,
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<ShrinkResult<JobReport>>,
}

impl JobHandle {
    /// Identifier of the running job.
    #[must_use]
    pub const fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Ask the job to stop; the process is killed. Returns `false` when the
    /// job already finished or was cancelled before.
    pub fn cancel(&mut self) -> bool {
        self.cancel
            .take()
            .is_some_and(|sender| sender.send(()).is_ok())
    }

    /// Whether the supervising task has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the job to finish.
    ///
    /// # Errors
    ///
    /// Returns the job's error, or [`ShrinkError::Join`] if the task panicked.
    pub async fn wait(self) -> ShrinkResult<JobReport> {
        self.task
            .await
            .map_err(|source| ShrinkError::Join { source })?
    }
}
