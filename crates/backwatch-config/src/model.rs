//! Typed configuration models shared across the workspace.
//!
//! # Design
//! - `ShrinkSettings` is the persisted document; `WatchProfile` is the
//!   process-level profile assembled at startup.
//! - Flag order is insertion order and is preserved across save/load.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::ConfigError;

/// Known pishrink flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShrinkFlag {
    /// Answer yes to every prompt.
    #[serde(rename = "-a")]
    AutoYes,
    /// Emit debug output.
    #[serde(rename = "-d")]
    Debug,
    /// Remove logs from the shrunk image.
    #[serde(rename = "-r")]
    RemoveLogs,
    /// Skip the free-space check before copying.
    #[serde(rename = "-f")]
    SkipFreeSpaceCheck,
    /// Do not enable filesystem autoexpand on first boot.
    #[serde(rename = "-s")]
    SkipAutoExpand,
    /// Compress the image after shrinking.
    #[serde(rename = "-z")]
    Compress,
}

impl ShrinkFlag {
    /// Every known flag in presentation order.
    pub const ALL: [Self; 6] = [
        Self::AutoYes,
        Self::Debug,
        Self::RemoveLogs,
        Self::SkipFreeSpaceCheck,
        Self::SkipAutoExpand,
        Self::Compress,
    ];

    /// Command-line token understood by the shrink script.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::AutoYes => "-a",
            Self::Debug => "-d",
            Self::RemoveLogs => "-r",
            Self::SkipFreeSpaceCheck => "-f",
            Self::SkipAutoExpand => "-s",
            Self::Compress => "-z",
        }
    }

    /// Human-readable meaning of the flag.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::AutoYes => "automatically answer yes to prompts",
            Self::Debug => "write debug messages",
            Self::RemoveLogs => "remove logs and apt archives from the image",
            Self::SkipFreeSpaceCheck => "skip the free space check",
            Self::SkipAutoExpand => "do not expand the filesystem on boot",
            Self::Compress => "compress the image after shrinking",
        }
    }
}

impl Display for ShrinkFlag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for ShrinkFlag {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|flag| flag.token() == value.trim())
            .ok_or_else(|| ConfigError::UnknownFlag {
                value: value.to_string(),
            })
    }
}

/// Ordered, de-duplicated set of enabled shrink flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShrinkOptions {
    flags: Vec<ShrinkFlag>,
}

impl ShrinkOptions {
    /// Build options from flags, dropping repeats while keeping first order.
    #[must_use]
    pub fn from_flags(flags: impl IntoIterator<Item = ShrinkFlag>) -> Self {
        let mut options = Self::default();
        for flag in flags {
            options.enable(flag);
        }
        options
    }

    /// Parse options from string tokens such as `-a`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownFlag`] for unrecognised tokens.
    pub fn parse<I, S>(tokens: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let flags = tokens
            .into_iter()
            .map(|token| token.as_ref().parse::<ShrinkFlag>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_flags(flags))
    }

    /// Enable a flag; appended after the flags already enabled.
    pub fn enable(&mut self, flag: ShrinkFlag) {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }

    /// Disable a flag if it is enabled.
    pub fn disable(&mut self, flag: ShrinkFlag) {
        self.flags.retain(|existing| *existing != flag);
    }

    /// Whether the flag is currently enabled.
    #[must_use]
    pub fn is_enabled(&self, flag: ShrinkFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Enabled flags in order.
    #[must_use]
    pub fn flags(&self) -> &[ShrinkFlag] {
        &self.flags
    }

    /// Enabled flag tokens in order.
    pub fn tokens(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.flags.iter().map(|flag| flag.token())
    }

    /// Whether no flags are enabled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

/// Persisted user settings controlling shrink jobs and retention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShrinkSettings {
    /// Flags passed to the shrink script.
    pub options: ShrinkOptions,
    /// Write a per-job log next to the image.
    pub logging_enabled: bool,
    /// Record debug-level detail in the job log.
    pub advanced_logging: bool,
    /// Delete old sibling backups after a successful shrink.
    pub delete_backups: bool,
    /// Age in hours beyond which sibling backups are deleted.
    pub delete_hours: u32,
}

impl Default for ShrinkSettings {
    fn default() -> Self {
        Self {
            options: ShrinkOptions::default(),
            logging_enabled: false,
            advanced_logging: false,
            delete_backups: false,
            delete_hours: defaults::DELETE_HOURS,
        }
    }
}

impl ShrinkSettings {
    /// Retention age when deletion is enabled.
    #[must_use]
    pub fn retention(&self) -> Option<Duration> {
        self.delete_backups
            .then(|| Duration::from_secs(u64::from(self.delete_hours) * 3600))
    }
}

/// Process-level profile describing what to watch and how to shrink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchProfile {
    /// Roots watched recursively for new backup folders.
    pub roots: Vec<PathBuf>,
    /// Folder-name prefix; `None` accepts any prefix.
    pub prefix: Option<String>,
    /// Completion marker file name.
    pub marker: String,
    /// Image extension without the leading dot.
    pub image_extension: String,
    /// Path of the shrink script.
    pub shrink_script: PathBuf,
    /// Interpreter used to run the script.
    pub interpreter: String,
    /// Elevation wrapper prefixed to every invocation (may be empty).
    pub elevation: Vec<String>,
    /// Per-job log file name.
    pub job_log_name: String,
    /// Interval between marker polls.
    pub poll_interval: Duration,
    /// Delay after the marker appears.
    pub settle_delay: Duration,
    /// Upper bound on marker polling; unbounded when `None`.
    pub max_wait: Option<Duration>,
    /// Required idle window on image files before dispatch.
    pub quiescence: Option<Duration>,
    /// Maximum concurrently monitored folders.
    pub max_monitors: usize,
    /// Countdown before a discovered image is shrunk automatically.
    pub confirm_delay: Duration,
    /// Mount point that must be mounted before watching starts.
    pub mount_point: Option<PathBuf>,
    /// Time allowed for the mount point to appear.
    pub mount_timeout: Duration,
    /// Interval between mount checks.
    pub mount_interval: Duration,
    /// Location of the settings document.
    pub settings_path: PathBuf,
}

impl Default for WatchProfile {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            prefix: None,
            marker: defaults::MARKER_FILE_NAME.to_string(),
            image_extension: defaults::IMAGE_EXTENSION.to_string(),
            shrink_script: PathBuf::from(defaults::SHRINK_SCRIPT),
            interpreter: defaults::INTERPRETER.to_string(),
            elevation: vec![defaults::ELEVATION.to_string()],
            job_log_name: defaults::JOB_LOG_NAME.to_string(),
            poll_interval: Duration::from_secs(defaults::POLL_INTERVAL_SECS),
            settle_delay: Duration::from_secs(defaults::SETTLE_DELAY_SECS),
            max_wait: None,
            quiescence: None,
            max_monitors: defaults::MAX_MONITORS,
            confirm_delay: Duration::from_secs(defaults::CONFIRM_DELAY_SECS),
            mount_point: None,
            mount_timeout: Duration::from_secs(defaults::MOUNT_TIMEOUT_SECS),
            mount_interval: Duration::from_secs(defaults::MOUNT_INTERVAL_SECS),
            settings_path: PathBuf::from(defaults::SETTINGS_FILE_NAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_tokens_round_trip_through_from_str() {
        for flag in ShrinkFlag::ALL {
            assert_eq!(flag.token().parse::<ShrinkFlag>().ok(), Some(flag));
        }
        assert!(matches!(
            "-x".parse::<ShrinkFlag>(),
            Err(ConfigError::UnknownFlag { .. })
        ));
    }

    #[test]
    fn options_preserve_insertion_order_and_dedupe() {
        let mut options = ShrinkOptions::from_flags([
            ShrinkFlag::Compress,
            ShrinkFlag::AutoYes,
            ShrinkFlag::Compress,
        ]);
        assert_eq!(options.tokens().collect::<Vec<_>>(), vec!["-z", "-a"]);

        options.disable(ShrinkFlag::Compress);
        options.enable(ShrinkFlag::Compress);
        assert_eq!(options.tokens().collect::<Vec<_>>(), vec!["-a", "-z"]);
        assert!(options.is_enabled(ShrinkFlag::AutoYes));
        assert!(!options.is_enabled(ShrinkFlag::Debug));
    }

    #[test]
    fn settings_missing_keys_take_defaults() {
        let settings: ShrinkSettings =
            serde_json::from_str(r#"{"options":["-a"],"delete_backups":true}"#)
                .expect("settings parse");
        assert_eq!(settings.delete_hours, 168);
        assert!(!settings.logging_enabled);
        assert_eq!(settings.retention(), Some(Duration::from_secs(168 * 3600)));
    }

    #[test]
    fn settings_reject_unknown_flag_tokens() {
        let result = serde_json::from_str::<ShrinkSettings>(r#"{"options":["-q"]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn retention_disabled_yields_none() {
        assert_eq!(ShrinkSettings::default().retention(), None);
    }
}
