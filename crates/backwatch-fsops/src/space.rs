//! Free-space reporting for the filesystem that holds an image.

use std::path::Path;

use nix::sys::statvfs::statvfs;

use crate::error::{FsOpsError, FsOpsResult};

/// Bytes available to unprivileged users on the filesystem holding `path`.
///
/// # Errors
///
/// Returns [`FsOpsError::Nix`] when `statvfs` fails.
pub fn free_bytes(path: &Path) -> FsOpsResult<u64> {
    let stat = statvfs(path).map_err(|err| FsOpsError::nix("statvfs", path, err))?;
    #[allow(clippy::useless_conversion)]
    let available = u64::from(stat.blocks_available());
    #[allow(clippy::useless_conversion)]
    let fragment = u64::from(stat.fragment_size());
    Ok(available.saturating_mul(fragment))
}

/// Human-readable byte count using binary units.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut unit = 0;
    let mut whole = bytes;
    let mut rem = 0;
    while whole >= 1024 && unit < UNITS.len() - 1 {
        rem = whole % 1024;
        whole /= 1024;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{whole}.{} {}", rem * 10 / 1024, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_uses_binary_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GiB");
    }

    #[test]
    fn free_bytes_reports_for_existing_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(free_bytes(dir.path()).is_ok());
    }

    #[test]
    fn free_bytes_fails_for_missing_path() {
        let err = free_bytes(Path::new("/definitely/not/here")).expect_err("missing path");
        assert!(matches!(err, FsOpsError::Nix { .. }));
    }
}
