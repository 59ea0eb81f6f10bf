//! Argument parsing and command dispatch.

use std::path::PathBuf;

use backwatch_config::defaults;
use backwatch_telemetry::{
    GlobalContextGuard, LogFormat, LoggingConfig, build_sha, init_logging, record_app_mode,
};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::commands::{discover, settings, shrink, sweep, watch};
use crate::context::{CliContext, CliResult};

#[derive(Parser)]
#[command(
    name = "backwatch",
    version,
    about = "Administrative CLI for the Backwatch backup shrinker"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "BACKWATCH_SETTINGS",
        default_value = defaults::SETTINGS_FILE_NAME,
        help = "Saved settings document"
    )]
    pub(crate) settings: PathBuf,
    #[arg(
        long,
        global = true,
        env = "BACKWATCH_PREFIX",
        help = "Backup folder prefix; '*' or unset accepts any prefix"
    )]
    pub(crate) prefix: Option<String>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[arg(
        long,
        global = true,
        env = "BACKWATCH_LOG_LEVEL",
        default_value = "warn",
        help = "Log filter when RUST_LOG is unset"
    )]
    pub(crate) log_level: String,
    #[arg(long, global = true, help = "Print Prometheus metrics after the command")]
    pub(crate) metrics: bool,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// List backup folders under a root with their images.
    Discover(DiscoverArgs),
    /// Shrink one image now, bypassing the watcher.
    Shrink(ShrinkArgs),
    /// Delete backups older than the retention age next to a folder.
    Sweep(SweepArgs),
    /// Inspect or change the saved settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Run the watcher daemon in the foreground.
    Watch,
}

impl Command {
    /// Mode recorded on the application span.
    pub(crate) const fn mode(&self) -> &'static str {
        match self {
            Self::Discover(_) => "cli-discover",
            Self::Shrink(_) => "cli-shrink",
            Self::Sweep(_) => "cli-sweep",
            Self::Settings(_) => "cli-settings",
            Self::Watch => "watch",
        }
    }
}

#[derive(Args)]
pub(crate) struct DiscoverArgs {
    /// Root holding backup folders.
    pub(crate) root: PathBuf,
    #[arg(long, env = "BACKWATCH_IMAGE_EXT", default_value = defaults::IMAGE_EXTENSION)]
    pub(crate) image_ext: String,
    #[arg(long, env = "BACKWATCH_MARKER", default_value = defaults::MARKER_FILE_NAME)]
    pub(crate) marker: String,
}

#[derive(Args)]
pub(crate) struct ShrinkArgs {
    /// Image to shrink.
    pub(crate) image: PathBuf,
    #[arg(long, env = "BACKWATCH_SCRIPT", default_value = defaults::SHRINK_SCRIPT)]
    pub(crate) script: PathBuf,
    #[arg(long, default_value = defaults::INTERPRETER)]
    pub(crate) interpreter: String,
    #[arg(
        long,
        env = "BACKWATCH_ELEVATION",
        default_value = defaults::ELEVATION,
        help = "Elevation wrapper; pass an empty string to run without one"
    )]
    pub(crate) elevation: String,
    #[arg(
        long = "option",
        value_name = "FLAG",
        allow_hyphen_values = true,
        value_delimiter = ',',
        help = "Override the saved flags (e.g. --option=-a,-z)"
    )]
    pub(crate) options: Vec<String>,
    #[arg(long, env = "BACKWATCH_JOB_LOG", default_value = defaults::JOB_LOG_NAME)]
    pub(crate) job_log: String,
    #[arg(long, help = "Skip the retention sweep after a successful shrink")]
    pub(crate) no_sweep: bool,
    #[arg(long, help = "Print the command without running it")]
    pub(crate) dry_run: bool,
}

#[derive(Args)]
pub(crate) struct SweepArgs {
    /// Folder of the current backup; it is never deleted.
    pub(crate) current: PathBuf,
    #[arg(long, help = "Retention age in hours; defaults to the saved setting")]
    pub(crate) hours: Option<u32>,
    #[arg(long, help = "Report what would be deleted without deleting")]
    pub(crate) dry_run: bool,
}

#[derive(Subcommand)]
pub(crate) enum SettingsCommand {
    /// Print the saved settings.
    Show,
    /// Change saved settings.
    Set(SettingsSetArgs),
    /// List the known shrink flags.
    Flags,
}

#[derive(Args)]
pub(crate) struct SettingsSetArgs {
    #[arg(
        long = "option",
        value_name = "FLAG",
        allow_hyphen_values = true,
        value_delimiter = ',',
        help = "Replace the enabled flags (e.g. --option=-a,-z)"
    )]
    pub(crate) options: Vec<String>,
    #[arg(long, conflicts_with = "options", help = "Disable every flag")]
    pub(crate) clear_options: bool,
    #[arg(long)]
    pub(crate) logging: Option<bool>,
    #[arg(long)]
    pub(crate) advanced_logging: Option<bool>,
    #[arg(long)]
    pub(crate) delete_backups: Option<bool>,
    #[arg(long)]
    pub(crate) delete_hours: Option<u32>,
}

/// Parses CLI arguments, executes the requested command and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let result = dispatch(cli).await;
    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

pub(crate) async fn dispatch(cli: Cli) -> CliResult<()> {
    if let Command::Watch = cli.command {
        return watch::handle_watch().await;
    }
    // The daemon installs its own subscriber; one-shot commands log to stderr.
    let _ = init_logging(&LoggingConfig {
        level: &cli.log_level,
        format: LogFormat::Pretty,
        build_sha: build_sha(),
        log_file: None,
    });
    let _context = GlobalContextGuard::new("cli");
    record_app_mode(cli.command.mode());

    let ctx = CliContext::new(cli.settings, cli.prefix, cli.output)?;
    match cli.command {
        Command::Discover(args) => discover::handle_discover(&ctx, &args)?,
        Command::Shrink(args) => shrink::handle_shrink(&ctx, args).await?,
        Command::Sweep(args) => sweep::handle_sweep(&ctx, &args)?,
        Command::Settings(command) => match command {
            SettingsCommand::Show => settings::handle_show(&ctx)?,
            SettingsCommand::Set(args) => settings::handle_set(&ctx, args)?,
            SettingsCommand::Flags => settings::handle_flags(&ctx)?,
        },
        Command::Watch => {}
    }
    if cli.metrics {
        crate::output::render_metrics(&ctx.metrics)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_values_may_start_with_a_hyphen() {
        let cli = Cli::try_parse_from([
            "backwatch",
            "shrink",
            "/b/raspihaupt-dd-backup-20240101-120000/disk.img",
            "--option=-a,-z",
            "--elevation",
            "",
        ])
        .expect("parse");
        let Command::Shrink(args) = cli.command else {
            panic!("expected shrink");
        };
        assert_eq!(args.options, vec!["-a".to_string(), "-z".to_string()]);
        assert!(args.elevation.is_empty());
        assert_eq!(args.interpreter, "bash");
    }

    #[test]
    fn each_command_records_its_own_mode() {
        let parse = |args: &[&str]| Cli::try_parse_from(args).expect("parse").command.mode();
        assert_eq!(parse(&["backwatch", "discover", "/b"]), "cli-discover");
        assert_eq!(parse(&["backwatch", "sweep", "/b/x"]), "cli-sweep");
        assert_eq!(parse(&["backwatch", "settings", "show"]), "cli-settings");
        assert_eq!(parse(&["backwatch", "watch"]), "watch");
    }

    #[test]
    fn settings_set_accepts_toggles() {
        let cli = Cli::try_parse_from([
            "backwatch",
            "--output",
            "json",
            "settings",
            "set",
            "--delete-backups",
            "true",
            "--delete-hours",
            "72",
        ])
        .expect("parse");
        assert_eq!(cli.output, OutputFormat::Json);
        let Command::Settings(SettingsCommand::Set(args)) = cli.command else {
            panic!("expected settings set");
        };
        assert_eq!(args.delete_backups, Some(true));
        assert_eq!(args.delete_hours, Some(72));
        assert!(args.options.is_empty());
    }

    #[test]
    fn clear_conflicts_with_explicit_options() {
        let result = Cli::try_parse_from([
            "backwatch",
            "settings",
            "set",
            "--clear-options",
            "--option=-a",
        ]);
        assert!(result.is_err());
    }
}
