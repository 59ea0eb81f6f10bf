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

//! Backwatch daemon wiring.
//!
//! Layout: `bootstrap.rs` (environment and service wiring), `orchestrator.rs`
//! (image discovery to shrink job), `confirm.rs` (job confirmation),
//! `mount.rs` (mount point wait).

/// Environment loading and the daemon boot sequence.
pub mod bootstrap;
/// Confirmation between discovery and shrink.
pub mod confirm;
/// Application error type.
pub mod error;
/// Mount point helpers.
pub mod mount;
/// Discovery-to-job orchestration.
pub mod orchestrator;

pub use bootstrap::{BootstrapDependencies, LogSettings, run_app, run_app_with};
pub use confirm::{AutoConfirm, Decision, JobConfirmation};
pub use error::{AppError, AppResult};
pub use mount::{is_mount_point, wait_for_mount};
pub use orchestrator::Orchestrator;
