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

//! Configuration for the Backwatch daemon.
//!
//! Layout: `model.rs` (shrink flags, saved settings, watch profile),
//! `loader.rs` (environment-driven profile loading), `store.rs` (JSON
//! settings persistence), `validate.rs` (validation helpers).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod store;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{env_flag_value, load_profile_from_env, load_profile_with};
pub use model::{ShrinkFlag, ShrinkOptions, ShrinkSettings, WatchProfile};
pub use store::SettingsStore;
