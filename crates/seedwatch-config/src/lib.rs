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

//! Configuration model for the descriptor watcher.
//!
//! Layout: `model.rs` (typed configuration), `defaults.rs` (default values), `validate.rs`
//! (field validation), `error.rs` (configuration errors).

pub mod defaults;
pub mod error;
pub mod model;
pub mod validate;

pub use defaults::{DEFAULT_DESCRIPTOR_PATTERN, DEFAULT_POLL_INTERVAL, DEFAULT_WATCH_INTERVAL};
pub use error::{ConfigError, ConfigResult};
pub use model::{TrackerSettings, WatchConfig};
