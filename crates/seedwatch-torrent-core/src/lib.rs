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

//! Engine-agnostic transfer interfaces and DTOs.
//!
//! Layout: `service` (engine and handle traits), `model` (progress snapshot and peer counts),
//! `rate` (throughput and ETA math), `format` (byte, speed, and duration strings),
//! `error` (shared error type).

pub mod error;
pub mod format;
pub mod model;
pub mod rate;
pub mod service;

pub use error::{TorrentError, TorrentResult, error_chain};
pub use format::{byte_unit, format_duration, format_eta, format_progress, format_speed};
pub use model::{PeerCounts, ProgressSnapshot};
pub use rate::{Eta, MEGABYTE, estimate_eta, throughput_bps};
pub use service::{TransferEngine, TransferHandle};
