use anyhow::anyhow;
use backwatch_config::{ShrinkOptions, WatchProfile};
use backwatch_fsops::{RetentionSweeper, format_bytes, free_bytes};
use backwatch_shrink::{EventSink, JobReport, JobSink, ShrinkError, ShrinkJob, ShrinkRunner};
use tracing::debug;

use crate::cli::ShrinkArgs;
use crate::context::{CliContext, CliError, CliResult, classify_config};
use crate::output::render_job_report;

/// Echoes job output to the terminal while keeping events and metrics.
struct ConsoleSink {
    inner: EventSink,
}

impl JobSink for ConsoleSink {
    fn started(&self, job: &ShrinkJob) {
        eprintln!("running: {}", job.command());
        self.inner.started(job);
    }

    fn output(&self, job: &ShrinkJob, line: &str) {
        println!("{line}");
        self.inner.output(job, line);
    }

    fn error(&self, job: &ShrinkJob, error: &ShrinkError) {
        self.inner.error(job, error);
    }

    fn finished(&self, job: &ShrinkJob, report: &JobReport) {
        self.inner.finished(job, report);
    }
}

pub(crate) async fn handle_shrink(ctx: &CliContext, args: ShrinkArgs) -> CliResult<()> {
    let dry_run = args.dry_run;
    let job = prepare(ctx, args)?;
    if dry_run {
        println!("{}", job.command());
        return Ok(());
    }
    match free_bytes(job.folder()) {
        Ok(bytes) => eprintln!("free space: {}", format_bytes(bytes)),
        Err(err) => debug!(error = %err, "free space unavailable"),
    }

    let runner = ShrinkRunner::new(RetentionSweeper::new(
        ctx.naming()?,
        ctx.events.clone(),
        ctx.metrics.clone(),
    ));
    let sink = ConsoleSink {
        inner: EventSink::new(ctx.events.clone(), ctx.metrics.clone()),
    };
    let report = runner
        .run(&job, &sink)
        .await
        .map_err(|err| CliError::failure(anyhow!(err.detail())))?;
    render_job_report(&report, ctx.output)
}

fn prepare(ctx: &CliContext, args: ShrinkArgs) -> CliResult<ShrinkJob> {
    if !args.image.is_file() {
        return Err(CliError::validation(format!(
            "image {} does not exist",
            args.image.display()
        )));
    }
    let mut settings = ctx.load_settings()?;
    if !args.options.is_empty() {
        settings.options = ShrinkOptions::parse(&args.options).map_err(classify_config)?;
    }
    if args.no_sweep {
        settings.delete_backups = false;
    }
    let profile = WatchProfile {
        prefix: ctx.prefix.clone(),
        shrink_script: args.script,
        interpreter: args.interpreter,
        elevation: args
            .elevation
            .split_whitespace()
            .map(str::to_string)
            .collect(),
        job_log_name: args.job_log,
        ..WatchProfile::default()
    };
    ShrinkJob::new(&args.image, settings, &profile)
        .map_err(|err| CliError::validation(err.detail()))
}
