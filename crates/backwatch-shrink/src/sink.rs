//! Destinations for job output and job failures.

use backwatch_events::{Event, EventBus};
use backwatch_telemetry::Metrics;

use crate::error::ShrinkError;
use crate::job::ShrinkJob;
use crate::runner::JobReport;

/// Receives a job's lifecycle, output lines and its single failure.
pub trait JobSink: Send + Sync {
    /// The process is about to be launched.
    fn started(&self, _job: &ShrinkJob) {}

    /// One line of merged stdout/stderr, or the completion line.
    fn output(&self, job: &ShrinkJob, line: &str);

    /// The job failed; called at most once per job.
    fn error(&self, job: &ShrinkJob, error: &ShrinkError);

    /// The job finished successfully.
    fn finished(&self, _job: &ShrinkJob, _report: &JobReport) {}
}

/// Sink that republishes everything on the event bus.
#[derive(Clone)]
pub struct EventSink {
    events: EventBus,
    metrics: Metrics,
}

impl EventSink {
    /// Construct a sink publishing on `events`.
    #[must_use]
    pub const fn new(events: EventBus, metrics: Metrics) -> Self {
        Self { events, metrics }
    }

    fn publish(&self, event: Event) {
        self.metrics.inc_event(event.kind());
        let _ = self.events.publish(event);
    }
}

impl JobSink for EventSink {
    fn started(&self, job: &ShrinkJob) {
        self.metrics.add_active_jobs(1);
        self.publish(Event::ShrinkStarted {
            job_id: job.id(),
            image: job.image().to_path_buf(),
            command: job.command().display().to_string(),
        });
    }

    fn output(&self, job: &ShrinkJob, line: &str) {
        self.publish(Event::ShrinkOutput {
            job_id: job.id(),
            line: line.to_string(),
        });
    }

    fn error(&self, job: &ShrinkJob, error: &ShrinkError) {
        self.metrics.add_active_jobs(-1);
        self.metrics.inc_shrink_job("failed");
        self.publish(Event::ShrinkFailed {
            job_id: job.id(),
            image: job.image().to_path_buf(),
            message: error.detail(),
        });
    }

    fn finished(&self, job: &ShrinkJob, report: &JobReport) {
        self.metrics.add_active_jobs(-1);
        self.metrics.inc_shrink_job("completed");
        self.publish(Event::ShrinkCompleted {
            job_id: job.id(),
            image: job.image().to_path_buf(),
            status: report.status.clone(),
        });
    }
}
