//! Engine and handle traits implemented by transfer adapters.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TorrentResult;
use crate::model::PeerCounts;

/// Transfer engine that admits descriptor files.
#[async_trait]
pub trait TransferEngine: Send + Sync {
    /// Load a descriptor file and register its transfer; the transfer is not started yet.
    async fn add_from_descriptor(&self, path: &Path) -> TorrentResult<Arc<dyn TransferHandle>>;
}

/// Live handle to one transfer inside the engine.
///
/// Counter accessors must not block; they are read while the tracker holds its record lock.
#[async_trait]
pub trait TransferHandle: Send + Sync {
    /// Transfer name once metadata is known.
    fn name(&self) -> Option<String>;

    /// Resolves once the transfer's metadata (name, total length) is known.
    async fn metadata_ready(&self);

    /// Begin or resume downloading every piece.
    async fn start(&self) -> TorrentResult<()>;

    /// Release the transfer from the engine's active set.
    async fn drop_transfer(&self);

    /// Bytes verified so far.
    fn bytes_completed(&self) -> u64;

    /// Total payload length; `None` until metadata is known.
    fn total_length(&self) -> Option<u64>;

    /// Currently connected peers.
    fn peer_counts(&self) -> PeerCounts;

    /// Whether the engine is still actively transferring this payload.
    fn is_active(&self) -> bool;
}
