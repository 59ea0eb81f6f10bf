use anyhow::Context;
use backwatch_fsops::{free_bytes, list_images, scan_backups};

use crate::cli::DiscoverArgs;
use crate::context::{CliContext, CliError, CliResult};
use crate::output::{DiscoveredBackup, DiscoveryReport, render_discovery};

pub(crate) fn handle_discover(ctx: &CliContext, args: &DiscoverArgs) -> CliResult<()> {
    let report = discover(ctx, args)?;
    render_discovery(&report, ctx.output)
}

pub(crate) fn discover(ctx: &CliContext, args: &DiscoverArgs) -> CliResult<DiscoveryReport> {
    if !args.root.is_dir() {
        return Err(CliError::validation(format!(
            "backup root {} does not exist",
            args.root.display()
        )));
    }
    let naming = ctx.naming()?;
    let entries = scan_backups(&args.root, &naming)
        .with_context(|| format!("failed to scan {}", args.root.display()))
        .map_err(CliError::failure)?;

    let mut backups = Vec::with_capacity(entries.len());
    for entry in entries {
        let images = list_images(&entry.path, &args.image_ext)
            .with_context(|| format!("failed to list images in {}", entry.path.display()))
            .map_err(CliError::failure)?;
        backups.push(DiscoveredBackup {
            complete: entry.path.join(&args.marker).is_file(),
            path: entry.path,
            created_at: entry.created_at,
            images,
        });
    }

    Ok(DiscoveryReport {
        root: args.root.clone(),
        free_bytes: free_bytes(&args.root).ok(),
        backups,
    })
}
