//! Validation helpers for profile values sourced from the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{ShrinkSettings, WatchProfile};

pub(crate) fn parse_secs(field: &'static str, raw: &str) -> ConfigResult<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::invalid("profile", field, Some(raw.to_string()), "not_seconds"))
}

pub(crate) fn parse_positive_secs(field: &'static str, raw: &str) -> ConfigResult<Duration> {
    let value = parse_secs(field, raw)?;
    if value.is_zero() {
        return Err(ConfigError::invalid(
            "profile",
            field,
            Some(raw.to_string()),
            "must_be_positive",
        ));
    }
    Ok(value)
}

pub(crate) fn parse_count(field: &'static str, raw: &str) -> ConfigResult<usize> {
    match raw.trim().parse::<usize>() {
        Ok(0) | Err(_) => Err(ConfigError::invalid(
            "profile",
            field,
            Some(raw.to_string()),
            "must_be_positive_integer",
        )),
        Ok(value) => Ok(value),
    }
}

/// Split a path list on `:` or `,` and drop empty entries.
pub(crate) fn parse_path_list(raw: &str) -> Vec<PathBuf> {
    raw.split([':', ','])
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Validate the profile's cross-field constraints.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when a constraint is violated.
pub fn validate_profile(profile: &WatchProfile) -> ConfigResult<()> {
    if profile.roots.is_empty() {
        return Err(ConfigError::invalid("profile", "roots", None, "empty"));
    }
    if profile.marker.trim().is_empty() || profile.marker.contains('/') {
        return Err(ConfigError::invalid(
            "profile",
            "marker",
            Some(profile.marker.clone()),
            "must_be_file_name",
        ));
    }
    if profile.image_extension.trim().is_empty() || profile.image_extension.starts_with('.') {
        return Err(ConfigError::invalid(
            "profile",
            "image_extension",
            Some(profile.image_extension.clone()),
            "must_be_bare_extension",
        ));
    }
    if profile.poll_interval.is_zero() {
        return Err(ConfigError::invalid("profile", "poll_interval", None, "zero"));
    }
    if profile.max_monitors == 0 {
        return Err(ConfigError::invalid("profile", "max_monitors", None, "zero"));
    }
    Ok(())
}

/// Validate persisted settings.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when retention is enabled with a zero age.
pub fn validate_settings(settings: &ShrinkSettings) -> ConfigResult<()> {
    if settings.delete_backups && settings.delete_hours == 0 {
        return Err(ConfigError::invalid(
            "settings",
            "delete_hours",
            Some("0".to_string()),
            "must_be_positive",
        ));
    }
    Ok(())
}
