//! Environment-driven loading of the watch profile.
//!
//! # Design
//! - `load_profile_with` takes a lookup closure so tests never mutate the
//!   process environment.
//! - Unset variables keep the defaults from [`WatchProfile::default`].

use std::path::PathBuf;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::WatchProfile;
use crate::validate::{
    parse_count, parse_path_list, parse_positive_secs, parse_secs, validate_profile,
};

/// Load the profile from the process environment.
///
/// # Errors
///
/// Returns an error when `BACKWATCH_ROOTS` is missing or a value is invalid.
pub fn load_profile_from_env() -> ConfigResult<WatchProfile> {
    load_profile_with(|name| std::env::var(name).ok())
}

/// Load the profile from an arbitrary variable lookup.
///
/// # Errors
///
/// Returns an error when `BACKWATCH_ROOTS` is missing or a value is invalid.
pub fn load_profile_with<F>(lookup: F) -> ConfigResult<WatchProfile>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
    let mut profile = WatchProfile::default();

    let roots = get("BACKWATCH_ROOTS").ok_or(ConfigError::MissingEnv {
        name: "BACKWATCH_ROOTS",
    })?;
    profile.roots = parse_path_list(&roots);

    if let Some(script) = get("BACKWATCH_SCRIPT") {
        profile.shrink_script = PathBuf::from(script);
    }
    if let Some(settings) = get("BACKWATCH_SETTINGS") {
        profile.settings_path = PathBuf::from(settings);
    }
    if let Some(prefix) = get("BACKWATCH_PREFIX") {
        profile.prefix = (prefix.trim() != "*").then(|| prefix.trim().to_string());
    }
    if let Some(marker) = get("BACKWATCH_MARKER") {
        profile.marker = marker;
    }
    if let Some(ext) = get("BACKWATCH_IMAGE_EXT") {
        profile.image_extension = ext;
    }
    if let Some(name) = get("BACKWATCH_JOB_LOG") {
        profile.job_log_name = name;
    }
    if let Some(elevation) = lookup("BACKWATCH_ELEVATION") {
        profile.elevation = elevation.split_whitespace().map(str::to_string).collect();
    }
    if let Some(raw) = get("BACKWATCH_POLL_SECS") {
        profile.poll_interval = parse_positive_secs("poll_interval", &raw)?;
    }
    if let Some(raw) = get("BACKWATCH_SETTLE_SECS") {
        profile.settle_delay = parse_secs("settle_delay", &raw)?;
    }
    if let Some(raw) = get("BACKWATCH_MAX_WAIT_SECS") {
        profile.max_wait = Some(parse_positive_secs("max_wait", &raw)?);
    }
    if let Some(raw) = get("BACKWATCH_QUIESCENCE_SECS") {
        profile.quiescence = Some(parse_positive_secs("quiescence", &raw)?);
    }
    if let Some(raw) = get("BACKWATCH_MAX_MONITORS") {
        profile.max_monitors = parse_count("max_monitors", &raw)?;
    }
    if let Some(raw) = get("BACKWATCH_CONFIRM_SECS") {
        profile.confirm_delay = parse_secs("confirm_delay", &raw)?;
    }
    if let Some(mount) = get("BACKWATCH_MOUNT_POINT") {
        profile.mount_point = Some(PathBuf::from(mount));
    }
    if let Some(raw) = get("BACKWATCH_MOUNT_TIMEOUT_SECS") {
        profile.mount_timeout = parse_positive_secs("mount_timeout", &raw)?;
    }

    validate_profile(&profile)?;
    debug!(roots = profile.roots.len(), "watch profile loaded");
    Ok(profile)
}

/// Interpret common truthy spellings of a flag variable.
#[must_use]
pub fn env_flag_value(value: Option<&str>) -> bool {
    value.is_some_and(|raw| {
        matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}
