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

//! Thin entrypoint delegating to [`backwatch_cli::run`].

#[tokio::main]
async fn main() {
    let code = backwatch_cli::run().await;
    std::process::exit(code);
}
