//! JSON-backed persistence for [`ShrinkSettings`].
//!
//! # Design
//! - A missing document yields defaults; a malformed one is an error.
//! - Saves go through a sibling temporary file and a rename.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::model::ShrinkSettings;
use crate::validate::validate_settings;

/// Settings document on disk.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Create a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the settings document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, returning defaults when the document does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read, is malformed, or
    /// carries unknown flag tokens.
    pub fn load(&self) -> ConfigResult<ShrinkSettings> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "settings file absent; using defaults");
                return Ok(ShrinkSettings::default());
            }
            Err(err) => return Err(ConfigError::io("settings.read", &self.path, err)),
        };
        let settings: ShrinkSettings = serde_json::from_str(&raw)
            .map_err(|err| ConfigError::json("settings.parse", &self.path, err))?;
        validate_settings(&settings)?;
        Ok(settings)
    }

    /// Persist settings atomically.
    ///
    /// # Errors
    ///
    /// Returns an error when validation or any filesystem step fails.
    pub fn save(&self, settings: &ShrinkSettings) -> ConfigResult<()> {
        validate_settings(settings)?;
        let rendered = serde_json::to_vec_pretty(settings)
            .map_err(|err| ConfigError::json("settings.render", &self.path, err))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|err| ConfigError::io("settings.create_dir", parent, err))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)
                .map_err(|err| ConfigError::io("settings.create_tmp", &tmp, err))?;
            file.write_all(&rendered)
                .and_then(|()| file.sync_all())
                .map_err(|err| ConfigError::io("settings.write_tmp", &tmp, err))?;
        }
        fs::rename(&tmp, &self.path)
            .map_err(|err| ConfigError::io("settings.rename", &self.path, err))?;

        info!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}
