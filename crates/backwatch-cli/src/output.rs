//! Output renderers and formatting helpers for CLI commands.

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use backwatch_config::{ShrinkFlag, ShrinkSettings};
use backwatch_fsops::{SweepReport, format_bytes};
use backwatch_shrink::JobReport;
use backwatch_telemetry::Metrics;
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::context::{CliError, CliResult};

/// Backup folder found by `discover`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct DiscoveredBackup {
    pub(crate) path: PathBuf,
    pub(crate) created_at: NaiveDateTime,
    /// Whether the completion marker is present.
    pub(crate) complete: bool,
    pub(crate) images: Vec<PathBuf>,
}

/// Result of scanning one root.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct DiscoveryReport {
    pub(crate) root: PathBuf,
    pub(crate) free_bytes: Option<u64>,
    pub(crate) backups: Vec<DiscoveredBackup>,
}

#[derive(Serialize)]
struct SettingsView<'a> {
    path: &'a Path,
    #[serde(flatten)]
    settings: &'a ShrinkSettings,
}

#[derive(Serialize)]
struct FlagView {
    token: &'static str,
    description: &'static str,
}

#[derive(Serialize)]
struct SweepView<'a> {
    dry_run: bool,
    #[serde(flatten)]
    report: &'a SweepReport,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn render_discovery(report: &DiscoveryReport, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(report)?,
        OutputFormat::Table => {
            println!("root: {}", report.root.display());
            if let Some(bytes) = report.free_bytes {
                println!("free: {}", format_bytes(bytes));
            }
            println!("{:<19} {:<8} {:>6} FOLDER", "CREATED", "MARKER", "IMAGES");
            for backup in &report.backups {
                let name = backup
                    .path
                    .file_name()
                    .map_or_else(|| backup.path.display().to_string(), |name| {
                        name.to_string_lossy().into_owned()
                    });
                println!(
                    "{:<19} {:<8} {:>6} {}",
                    backup.created_at.format("%Y-%m-%d %H:%M:%S"),
                    if backup.complete { "yes" } else { "no" },
                    backup.images.len(),
                    name
                );
            }
            if report.backups.is_empty() {
                println!("no backup folders found");
            }
        }
    }
    Ok(())
}

pub(crate) fn render_sweep(
    report: &SweepReport,
    dry_run: bool,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&SweepView { dry_run, report })?,
        OutputFormat::Table => render_sweep_lines(report, dry_run),
    }
    Ok(())
}

fn render_sweep_lines(report: &SweepReport, dry_run: bool) {
    let verb = if dry_run { "would delete" } else { "deleted" };
    for path in &report.deleted {
        println!("{verb}: {}", path.display());
    }
    for failure in &report.failed {
        println!("failed: {} ({})", failure.path.display(), failure.message);
    }
    println!(
        "{verb} {} folder(s), kept {}, freed {}",
        report.deleted.len(),
        report.skipped,
        format_bytes(report.freed_bytes)
    );
}

pub(crate) fn render_settings(
    settings: &ShrinkSettings,
    path: &Path,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&SettingsView { path, settings })?,
        OutputFormat::Table => {
            println!("file: {}", path.display());
            let tokens: Vec<&str> = settings.options.tokens().collect();
            println!(
                "options: {}",
                if tokens.is_empty() {
                    "(none)".to_string()
                } else {
                    tokens.join(" ")
                }
            );
            println!("logging: {}", settings.logging_enabled);
            println!("advanced logging: {}", settings.advanced_logging);
            println!("delete backups: {}", settings.delete_backups);
            println!("delete after: {}h", settings.delete_hours);
        }
    }
    Ok(())
}

pub(crate) fn render_flags(format: OutputFormat) -> CliResult<()> {
    let flags: Vec<FlagView> = ShrinkFlag::ALL
        .into_iter()
        .map(|flag| FlagView {
            token: flag.token(),
            description: flag.description(),
        })
        .collect();
    match format {
        OutputFormat::Json => print_json(&flags)?,
        OutputFormat::Table => {
            for flag in &flags {
                println!("{:<4} {}", flag.token, flag.description);
            }
        }
    }
    Ok(())
}

pub(crate) fn render_job_report(report: &JobReport, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(report)?,
        OutputFormat::Table => {
            println!("job: {}", report.job_id);
            println!("image: {}", report.image.display());
            println!("status: {}", report.status);
            println!("lines: {}", report.lines);
            if let Some(sweep) = &report.sweep {
                render_sweep_lines(sweep, false);
            }
        }
    }
    Ok(())
}

pub(crate) fn render_metrics(metrics: &Metrics) -> CliResult<()> {
    let text = metrics
        .render()
        .map_err(|err| CliError::failure(anyhow!("failed to render metrics: {err}")))?;
    print!("{text}");
    Ok(())
}
