#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub, unused)]
#![allow(clippy::module_name_repetitions)]

//! Filesystem side of Backwatch: backup naming, image discovery, settle
//! detection, retention sweeps, busy-folder tracking and free-space
//! reporting.

pub mod active;
pub mod discovery;
pub mod error;
pub mod naming;
pub mod retention;
pub mod settle;
pub mod space;

pub use active::{ActiveFolderGuard, ActiveFolders};
pub use discovery::{BackupEntry, list_images, scan_backups, stale_backups};
pub use error::{FsOpsError, FsOpsResult};
pub use naming::{BackupFolderName, BackupNaming};
pub use retention::{RetentionSweeper, SweepFailure, SweepReport};
pub use settle::{SettleConfig, SettleDetector, SettleOutcome};
pub use space::{format_bytes, free_bytes};
