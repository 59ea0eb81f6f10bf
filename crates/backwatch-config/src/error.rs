//! Error types for configuration operations.
//!
//! # Design
//! - Constant messages; context lives in structured fields.
//! - Preserve source errors without interpolating them into messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation.
        section: &'static str,
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// A required environment variable was not provided.
    #[error("missing environment configuration")]
    MissingEnv {
        /// Name of the missing variable.
        name: &'static str,
    },
    /// Shrink flag token was not recognised.
    #[error("unknown shrink flag")]
    UnknownFlag {
        /// Token provided by the caller.
        value: String,
    },
    /// Settings document could not be parsed or rendered.
    #[error("settings document is invalid")]
    Json {
        /// Operation identifier.
        operation: &'static str,
        /// Settings path involved.
        path: PathBuf,
        /// Source serde error.
        source: serde_json::Error,
    },
    /// File system operation failed.
    #[error("filesystem operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
}

impl ConfigError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: serde_json::Error,
    ) -> Self {
        Self::Json {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) const fn invalid(
        section: &'static str,
        field: &'static str,
        value: Option<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section,
            field,
            value,
            reason,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn config_error_helpers_build_variants() {
        let io_err = ConfigError::io("read", "settings.json", io::Error::other("io"));
        assert!(matches!(io_err, ConfigError::Io { .. }));
        assert!(io_err.source().is_some());
        assert_eq!(io_err.to_string(), "filesystem operation failed");

        let invalid = ConfigError::invalid("settings", "delete_hours", Some("0".into()), "zero");
        assert!(matches!(
            invalid,
            ConfigError::InvalidField {
                field: "delete_hours",
                reason: "zero",
                ..
            }
        ));
        assert!(invalid.source().is_none());
    }
}
