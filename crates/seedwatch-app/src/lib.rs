#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub)]
#![allow(clippy::module_name_repetitions)]

//! Seedwatch application wiring.
//!
//! Layout: `cli.rs` (flags and configuration), `bootstrap.rs` (supervisor start and shutdown),
//! `ingest.rs` (watcher to registry bridge), `error.rs` (application errors).

/// Command-line surface.
pub mod cli;
/// Supervisor bootstrap and shutdown.
pub mod bootstrap;
/// Application error types.
pub mod error;
/// Ingestion bridge between the directory watcher and the registry.
pub mod ingest;

pub use bootstrap::{Supervisor, run_app};
pub use cli::{Cli, normalize_args};
pub use error::{AppError, AppResult};
pub use ingest::IngestionBridge;
