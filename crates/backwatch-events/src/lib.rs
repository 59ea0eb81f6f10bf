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

//! Event bus for Backwatch.
//!
//! Layout: `payloads.rs` (event types), `routing.rs` (broadcast bus with a backlog ring).

pub mod payloads;
pub mod routing;

pub use payloads::{
    DEFAULT_REPLAY_CAPACITY, DetectionTrigger, Event, EventEnvelope, EventId, JobId,
};
pub use routing::{EventBus, EventStream};
