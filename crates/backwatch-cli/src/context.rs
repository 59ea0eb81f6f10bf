//! Shared CLI state and error classification.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use anyhow::anyhow;
use backwatch_config::{ConfigError, SettingsStore, ShrinkSettings};
use backwatch_events::EventBus;
use backwatch_fsops::BackupNaming;
use backwatch_telemetry::Metrics;

use crate::cli::OutputFormat;

/// Error type used by CLI handlers: validation problems exit with 2,
/// everything else with 3.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Map configuration errors onto CLI exit classes.
pub(crate) fn classify_config(err: ConfigError) -> CliError {
    match err {
        ConfigError::UnknownFlag { value } => CliError::validation(format!(
            "unknown shrink flag '{value}' (see `backwatch settings flags`)"
        )),
        ConfigError::InvalidField {
            field,
            reason,
            value,
            ..
        } => CliError::validation(match value {
            Some(value) => format!("invalid {field} '{value}': {reason}"),
            None => format!("invalid {field}: {reason}"),
        }),
        ConfigError::MissingEnv { name } => {
            CliError::validation(format!("{name} must be set"))
        }
        ConfigError::Json { path, source, .. } => CliError::failure(anyhow!(
            "settings file {} is not valid: {source}",
            path.display()
        )),
        ConfigError::Io { path, source, .. } => CliError::failure(anyhow!(
            "settings file {} is not accessible: {source}",
            path.display()
        )),
    }
}

/// Dependencies shared by every command handler.
pub(crate) struct CliContext {
    pub(crate) store: SettingsStore,
    pub(crate) prefix: Option<String>,
    pub(crate) output: OutputFormat,
    pub(crate) events: EventBus,
    pub(crate) metrics: Metrics,
}

impl CliContext {
    pub(crate) fn new(
        settings: PathBuf,
        prefix: Option<String>,
        output: OutputFormat,
    ) -> CliResult<Self> {
        let metrics = Metrics::new()
            .map_err(|err| CliError::failure(anyhow!("failed to register metrics: {err}")))?;
        Ok(Self {
            store: SettingsStore::new(settings),
            prefix: prefix.filter(|value| value.trim() != "*"),
            output,
            events: EventBus::new(),
            metrics,
        })
    }

    pub(crate) fn naming(&self) -> CliResult<BackupNaming> {
        BackupNaming::new(self.prefix.as_deref())
            .map_err(|err| CliError::validation(format!("invalid backup prefix: {err}")))
    }

    pub(crate) fn load_settings(&self) -> CliResult<ShrinkSettings> {
        self.store.load().map_err(classify_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(CliError::validation("bad").exit_code(), 2);
        assert_eq!(CliError::failure(anyhow!("boom")).exit_code(), 3);
    }

    #[test]
    fn unknown_flag_is_a_validation_error() {
        let err = classify_config(ConfigError::UnknownFlag { value: "-x".into() });
        assert!(matches!(err, CliError::Validation(ref msg) if msg.contains("-x")));
    }

    #[test]
    fn wildcard_prefix_accepts_any_name() -> Result<(), CliError> {
        let ctx = CliContext::new("s.json".into(), Some("*".into()), OutputFormat::Table)?;
        assert!(ctx.naming()?.matches("anything-dd-backup-20240101-120000"));
        Ok(())
    }
}
