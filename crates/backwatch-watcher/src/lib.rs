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

//! Filesystem watching for Backwatch: notify subscription, dispatch of new
//! backup folders and the shared record of claimed folders.

pub mod error;
pub mod state;
pub mod watcher;

pub use error::{WatchError, WatchResult};
pub use state::WatchState;
pub use watcher::{BackupWatcher, DispatchOutcome, WatchHandle};
