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

//! Filesystem side of the supervisor: finding descriptor files, watching the input directory, and
//! deleting descriptors once their transfer has finished.
//!
//! Layout: `descriptor.rs` (pattern filter, initial listing, removal), `watch.rs` (polling
//! directory watcher), `error.rs` (error types).

pub mod descriptor;
pub mod error;
pub mod watch;

pub use descriptor::{DescriptorFilter, initial_listing, remove_descriptor};
pub use error::{FsOpsError, FsOpsResult};
pub use watch::{DirectoryWatcher, WatchEvent, WatchReceiver};
