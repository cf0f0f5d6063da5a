#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub)]

//! Binary entrypoint that parses the command line and runs the supervisor until Ctrl-C.

use seedwatch_app::{AppResult, run_app};

/// Runs the seedwatch supervisor and blocks until shutdown.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app().await
}
