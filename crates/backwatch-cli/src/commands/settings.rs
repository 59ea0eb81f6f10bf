use backwatch_config::{ShrinkOptions, ShrinkSettings};

use crate::cli::SettingsSetArgs;
use crate::context::{CliContext, CliResult, classify_config};
use crate::output::{render_flags, render_settings};

pub(crate) fn handle_show(ctx: &CliContext) -> CliResult<()> {
    let settings = ctx.load_settings()?;
    render_settings(&settings, ctx.store.path(), ctx.output)
}

pub(crate) fn handle_set(ctx: &CliContext, args: SettingsSetArgs) -> CliResult<()> {
    let updated = apply(ctx.load_settings()?, args)?;
    ctx.store.save(&updated).map_err(classify_config)?;
    render_settings(&updated, ctx.store.path(), ctx.output)
}

pub(crate) fn handle_flags(ctx: &CliContext) -> CliResult<()> {
    render_flags(ctx.output)
}

fn apply(mut settings: ShrinkSettings, args: SettingsSetArgs) -> CliResult<ShrinkSettings> {
    if args.clear_options {
        settings.options = ShrinkOptions::default();
    } else if !args.options.is_empty() {
        settings.options = ShrinkOptions::parse(&args.options).map_err(classify_config)?;
    }
    if let Some(enabled) = args.logging {
        settings.logging_enabled = enabled;
    }
    if let Some(enabled) = args.advanced_logging {
        settings.advanced_logging = enabled;
    }
    if let Some(enabled) = args.delete_backups {
        settings.delete_backups = enabled;
    }
    if let Some(hours) = args.delete_hours {
        settings.delete_hours = hours;
    }
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use crate::context::CliError;
    use backwatch_config::ShrinkFlag;

    fn set_args() -> SettingsSetArgs {
        SettingsSetArgs {
            options: Vec::new(),
            clear_options: false,
            logging: None,
            advanced_logging: None,
            delete_backups: None,
            delete_hours: None,
        }
    }

    #[test]
    fn options_keep_the_given_order() -> Result<(), CliError> {
        let updated = apply(
            ShrinkSettings::default(),
            SettingsSetArgs {
                options: vec!["-z".into(), "-a".into(), "-z".into()],
                ..set_args()
            },
        )?;
        assert_eq!(
            updated.options.flags(),
            &[ShrinkFlag::Compress, ShrinkFlag::AutoYes]
        );
        Ok(())
    }

    #[test]
    fn unknown_flags_are_rejected() {
        let err = apply(
            ShrinkSettings::default(),
            SettingsSetArgs {
                options: vec!["-q".into()],
                ..set_args()
            },
        )
        .expect_err("unknown flag");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn set_persists_and_zero_retention_is_refused() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let ctx = CliContext::new(dir.path().join("settings.json"), None, OutputFormat::Json)
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        handle_set(
            &ctx,
            SettingsSetArgs {
                delete_backups: Some(true),
                delete_hours: Some(72),
                logging: Some(true),
                ..set_args()
            },
        )
        .map_err(|err| anyhow::anyhow!(err.display_message()))?;
        let saved = ctx.store.load()?;
        assert!(saved.delete_backups);
        assert_eq!(saved.delete_hours, 72);
        assert!(saved.logging_enabled);

        let err = handle_set(
            &ctx,
            SettingsSetArgs {
                delete_hours: Some(0),
                ..set_args()
            },
        )
        .expect_err("zero hours with retention enabled");
        assert_eq!(err.exit_code(), 2);
        assert_eq!(ctx.store.load()?.delete_hours, 72);
        Ok(())
    }
}
