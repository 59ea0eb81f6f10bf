//! Backup folder naming: `<prefix>-dd-backup-<YYYYMMDD>-<HHMMSS>`.

use std::fmt::{self, Display, Formatter};
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::error::{FsOpsError, FsOpsResult};

/// Matcher for backup folder names.
#[derive(Debug, Clone)]
pub struct BackupNaming {
    pattern: Regex,
}

impl BackupNaming {
    /// Build a matcher for `prefix`, or for any prefix when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::Pattern`] if the pattern fails to compile.
    pub fn new(prefix: Option<&str>) -> FsOpsResult<Self> {
        let prefix = prefix.map_or_else(|| ".+".to_string(), regex::escape);
        let source = format!(r"^(?P<prefix>{prefix})-dd-backup-(?P<date>[0-9]{{8}})-(?P<time>[0-9]{{6}})$");
        let pattern = Regex::new(&source).map_err(|source_err| FsOpsError::Pattern {
            pattern: source,
            source: source_err,
        })?;
        Ok(Self { pattern })
    }

    /// Whether `name` has the backup folder shape (timestamp not validated).
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.pattern.is_match(name)
    }

    /// Whether the last component of `path` has the backup folder shape.
    #[must_use]
    pub fn matches_path(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.matches(name))
    }

    /// Parse `name`.
    ///
    /// Returns `Ok(None)` when the name does not have the backup shape.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::InvalidTimestamp`] when the digits do not form a
    /// valid date and time.
    pub fn parse(&self, name: &str) -> FsOpsResult<Option<BackupFolderName>> {
        let Some(captures) = self.pattern.captures(name) else {
            return Ok(None);
        };
        let created_at = decode_stamp(&captures["date"], &captures["time"]).ok_or_else(|| {
            FsOpsError::InvalidTimestamp {
                name: name.to_string(),
            }
        })?;
        Ok(Some(BackupFolderName {
            prefix: captures["prefix"].to_string(),
            created_at,
        }))
    }

    /// Parse the last component of `path`.
    ///
    /// # Errors
    ///
    /// See [`BackupNaming::parse`].
    pub fn parse_path(&self, path: &Path) -> FsOpsResult<Option<BackupFolderName>> {
        match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => self.parse(name),
            None => Ok(None),
        }
    }
}

fn decode_stamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    let field = |digits: &str, range: std::ops::Range<usize>| digits.get(range)?.parse::<u32>().ok();
    let year = i32::try_from(field(date, 0..4)?).ok()?;
    NaiveDate::from_ymd_opt(year, field(date, 4..6)?, field(date, 6..8)?)?.and_hms_opt(
        field(time, 0..2)?,
        field(time, 2..4)?,
        field(time, 4..6)?,
    )
}

/// Parsed backup folder name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFolderName {
    /// Host prefix.
    pub prefix: String,
    /// Local timestamp encoded in the name.
    pub created_at: NaiveDateTime,
}

impl BackupFolderName {
    /// Render the folder name.
    #[must_use]
    pub fn format(&self) -> String {
        format!(
            "{}-dd-backup-{}",
            self.prefix,
            self.created_at.format("%Y%m%d-%H%M%S")
        )
    }
}

impl Display for BackupFolderName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}
