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

//! Shrink jobs: command construction, process supervision, per-job logs
//! and the retention sweep that follows a successful shrink.

pub mod command;
pub mod error;
pub mod job;
pub mod job_log;
mod lines;
pub mod runner;
pub mod sink;

pub use command::ShrinkCommand;
pub use error::{ShrinkError, ShrinkResult};
pub use job::ShrinkJob;
pub use job_log::{JobLog, JobLogLevel};
pub use runner::{COMPLETION_PREFIX, JobHandle, JobReport, ShrinkRunner};
pub use sink::{EventSink, JobSink};
