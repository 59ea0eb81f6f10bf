//! Command handlers grouped by concern.

pub(crate) mod discover;
pub(crate) mod settings;
pub(crate) mod shrink;
pub(crate) mod sweep;
pub(crate) mod watch;
