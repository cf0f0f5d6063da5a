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

//! Shared test helpers used across integration suites.
//! Layout: fixtures.rs (descriptor files, polling waits), engine.rs (scripted transfer engine),
//! events.rs (event-stream assertions).

pub mod engine;
pub mod events;
pub mod fixtures;

pub use engine::{ScriptedEngine, ScriptedTransfer};
pub use events::next_matching;
pub use fixtures::{descriptor_bytes, wait_until, write_descriptor};
