use std::time::Duration;

use anyhow::Context;
use backwatch_fsops::{RetentionSweeper, SweepReport};
use chrono::Local;

use crate::cli::SweepArgs;
use crate::context::{CliContext, CliError, CliResult};
use crate::output::render_sweep;

pub(crate) fn handle_sweep(ctx: &CliContext, args: &SweepArgs) -> CliResult<()> {
    let report = sweep(ctx, args)?;
    render_sweep(&report, args.dry_run, ctx.output)
}

pub(crate) fn sweep(ctx: &CliContext, args: &SweepArgs) -> CliResult<SweepReport> {
    if !args.current.is_dir() {
        return Err(CliError::validation(format!(
            "current backup folder {} does not exist",
            args.current.display()
        )));
    }
    let hours = match args.hours {
        Some(hours) => hours,
        None => ctx.load_settings()?.delete_hours,
    };
    if hours == 0 {
        return Err(CliError::validation("retention age must be at least one hour"));
    }

    let sweeper = RetentionSweeper::new(ctx.naming()?, ctx.events.clone(), ctx.metrics.clone())
        .dry_run(args.dry_run);
    sweeper
        .sweep(
            &args.current,
            Duration::from_secs(u64::from(hours) * 3600),
            Local::now().naive_local(),
        )
        .with_context(|| format!("retention sweep next to {} failed", args.current.display()))
        .map_err(CliError::failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use backwatch_test_support::fixtures::{BackupTree, now};

    fn context(tree: &BackupTree) -> anyhow::Result<CliContext> {
        CliContext::new(
            tree.path().join("settings.json"),
            Some("raspihaupt".into()),
            OutputFormat::Table,
        )
        .map_err(|err| anyhow::anyhow!(err.display_message()))
    }

    #[test]
    fn dry_run_reports_without_deleting() -> anyhow::Result<()> {
        let tree = BackupTree::new()?;
        let reference = now();
        let stale = tree.backup_hours_before(reference, 200)?;
        let current = tree.backup_hours_before(reference, 1)?;
        let ctx = context(&tree)?;

        let report = sweep(
            &ctx,
            &SweepArgs {
                current: current.clone(),
                hours: None,
                dry_run: true,
            },
        )
        .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        assert_eq!(report.deleted, vec![stale.clone()]);
        assert!(stale.exists());
        assert!(current.exists());
        Ok(())
    }

    #[test]
    fn explicit_hours_override_saved_settings() -> anyhow::Result<()> {
        let tree = BackupTree::new()?;
        let reference = now();
        let day_old = tree.backup_hours_before(reference, 30)?;
        let current = tree.backup_hours_before(reference, 1)?;
        let ctx = context(&tree)?;

        let report = sweep(
            &ctx,
            &SweepArgs {
                current,
                hours: Some(24),
                dry_run: false,
            },
        )
        .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        assert_eq!(report.deleted, vec![day_old.clone()]);
        assert!(!day_old.exists());
        Ok(())
    }

    #[test]
    fn zero_hours_is_rejected() -> anyhow::Result<()> {
        let tree = BackupTree::new()?;
        let current = tree.backup_hours_before(now(), 1)?;
        let ctx = context(&tree)?;
        let err = sweep(
            &ctx,
            &SweepArgs {
                current,
                hours: Some(0),
                dry_run: false,
            },
        )
        .expect_err("zero hours");
        assert_eq!(err.exit_code(), 2);
        Ok(())
    }
}
