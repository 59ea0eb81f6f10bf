#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Binary entrypoint for the Backwatch daemon.

use std::process::ExitCode;

use backwatch_app::run_app;

/// Runs the daemon until Ctrl-C; a missing root or mount exits non-zero.
#[tokio::main]
async fn main() -> ExitCode {
    match run_app().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("backwatchd: {err}: {err:?}");
            ExitCode::from(err.exit_code())
        }
    }
}
