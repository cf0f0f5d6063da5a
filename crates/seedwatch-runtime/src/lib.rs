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

//! Lifecycle registry and tracking loops for accepted descriptors.
//!
//! Layout: `record.rs` (per-transfer state and its invariants), `registry.rs` (append-only record
//! arena, admission, abort), `tracker.rs` (poll loop per transfer), `error.rs` (error types).

pub mod error;
pub mod record;
pub mod registry;
mod tracker;

pub use error::{RuntimeError, RuntimeResult};
pub use record::{LifecycleRecord, RecordId};
pub use registry::LifecycleRegistry;
