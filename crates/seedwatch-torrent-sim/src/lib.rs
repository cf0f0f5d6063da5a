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

//! In-process transfer engine that simulates payload progress from descriptor metainfo.
//!
//! # Design
//! - Descriptors are read and parsed on admission; malformed files are rejected there.
//! - Completion advances at a fixed byte rate between `start` and `drop_transfer`.
//! - Progress is banked per descriptor path when a transfer is dropped and resumed when the same
//!   descriptor is added again.

pub mod metainfo;

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use seedwatch_torrent_core::{
    PeerCounts, TorrentError, TorrentResult, TransferEngine, TransferHandle,
};
use tokio::time::Instant;
use tracing::{debug, info};

pub use metainfo::Metainfo;

type ResumeCache = Arc<Mutex<HashMap<PathBuf, u64>>>;

/// Default simulated throughput: 4 MiB per second.
pub const DEFAULT_RATE_BPS: u64 = 4 * 1024 * 1024;

/// Behaviour of the simulated swarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimSettings {
    /// Bytes completed per second while a transfer runs.
    pub rate_bps: u64,
    /// Peers the engine exchanges data with while a transfer runs.
    pub active_peers: u32,
    /// How many of the active peers hold the complete payload.
    pub connected_seeders: u32,
}

impl SimSettings {
    /// Peer counts reported for a running transfer.
    #[must_use]
    pub const fn peers(&self) -> PeerCounts {
        PeerCounts::from_active(self.active_peers, self.connected_seeders)
    }
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            rate_bps: DEFAULT_RATE_BPS,
            active_peers: 6,
            connected_seeders: 4,
        }
    }
}

/// Simulated engine admitting descriptor files from disk.
#[derive(Debug, Clone, Default)]
pub struct SimulatedEngine {
    settings: SimSettings,
    resume: ResumeCache,
}

impl SimulatedEngine {
    /// Construct an engine with the given swarm behaviour.
    #[must_use]
    pub fn new(settings: SimSettings) -> Self {
        Self {
            settings,
            resume: ResumeCache::default(),
        }
    }

    /// Progress banked for a descriptor by an earlier drop.
    #[must_use]
    pub fn banked(&self, path: &Path) -> Option<u64> {
        lock(&self.resume).get(path).copied()
    }
}

#[async_trait]
impl TransferEngine for SimulatedEngine {
    async fn add_from_descriptor(&self, path: &Path) -> TorrentResult<Arc<dyn TransferHandle>> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(|source| TorrentError::DescriptorIo {
                path: path.to_path_buf(),
                source,
            })?;
        let meta = metainfo::parse(&raw).map_err(|reason| TorrentError::InvalidDescriptor {
            path: path.to_path_buf(),
            reason,
        })?;
        let banked = self
            .banked(path)
            .unwrap_or(0)
            .min(meta.total_length);

        info!(
            descriptor = %path.display(),
            name = %meta.name,
            total_bytes = meta.total_length,
            resumed_bytes = banked,
            "simulated transfer admitted"
        );
        Ok(Arc::new(SimulatedTransfer {
            path: path.to_path_buf(),
            meta,
            settings: self.settings,
            resume: Arc::clone(&self.resume),
            state: Mutex::new(RunState {
                banked,
                running_since: None,
                released: false,
            }),
        }))
    }
}

struct RunState {
    banked: u64,
    running_since: Option<Instant>,
    released: bool,
}

struct SimulatedTransfer {
    path: PathBuf,
    meta: Metainfo,
    settings: SimSettings,
    resume: ResumeCache,
    state: Mutex<RunState>,
}

impl SimulatedTransfer {
    fn completed_at(&self, state: &RunState, now: Instant) -> u64 {
        let running = state.running_since.map_or(0, |since| {
            let nanos = now.saturating_duration_since(since).as_nanos();
            let gained = nanos.saturating_mul(u128::from(self.settings.rate_bps)) / 1_000_000_000;
            u64::try_from(gained).unwrap_or(u64::MAX)
        });
        state
            .banked
            .saturating_add(running)
            .min(self.meta.total_length)
    }
}

#[async_trait]
impl TransferHandle for SimulatedTransfer {
    fn name(&self) -> Option<String> {
        Some(self.meta.name.clone())
    }

    async fn metadata_ready(&self) {}

    async fn start(&self) -> TorrentResult<()> {
        let mut state = lock(&self.state);
        if state.released {
            return Err(TorrentError::OperationFailed {
                operation: "start",
                descriptor: Some(self.path.clone()),
                source: Box::new(io::Error::other("transfer already released")),
            });
        }
        if state.running_since.is_none() {
            state.running_since = Some(Instant::now());
        }
        Ok(())
    }

    async fn drop_transfer(&self) {
        let banked = {
            let mut state = lock(&self.state);
            if state.released {
                return;
            }
            let banked = self.completed_at(&state, Instant::now());
            state.banked = banked;
            state.running_since = None;
            state.released = true;
            banked
        };
        lock(&self.resume).insert(self.path.clone(), banked);
        debug!(descriptor = %self.path.display(), banked_bytes = banked, "simulated transfer released");
    }

    fn bytes_completed(&self) -> u64 {
        let state = lock(&self.state);
        self.completed_at(&state, Instant::now())
    }

    fn total_length(&self) -> Option<u64> {
        Some(self.meta.total_length)
    }

    fn peer_counts(&self) -> PeerCounts {
        if self.is_active() {
            self.settings.peers()
        } else {
            PeerCounts::default()
        }
    }

    fn is_active(&self) -> bool {
        let state = lock(&self.state);
        state.running_since.is_some() && !state.released
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_descriptor(dir: &Path, file: &str, name: &str, length: u64) -> io::Result<PathBuf> {
        let path = dir.join(file);
        let body = format!("d4:infod6:lengthi{length}e4:name{}:{name}ee", name.len());
        std::fs::write(&path, body)?;
        Ok(path)
    }

    #[tokio::test]
    async fn admitted_transfer_reports_metadata_and_idles_until_started() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = write_descriptor(temp.path(), "a.torrent", "alpha", 1_000)?;
        let engine = SimulatedEngine::default();

        let handle = engine.add_from_descriptor(&path).await?;
        handle.metadata_ready().await;
        assert_eq!(handle.name().as_deref(), Some("alpha"));
        assert_eq!(handle.total_length(), Some(1_000));
        assert!(!handle.is_active());
        assert_eq!(handle.bytes_completed(), 0);
        assert_eq!(handle.peer_counts(), PeerCounts::default());

        handle.start().await?;
        assert!(handle.is_active());
        assert_eq!(
            handle.peer_counts(),
            PeerCounts {
                seeders: 4,
                leechers: 2
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn progress_is_capped_at_total_length() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = write_descriptor(temp.path(), "a.torrent", "alpha", 1_000)?;
        let engine = SimulatedEngine::new(SimSettings {
            rate_bps: 1_000_000_000,
            ..SimSettings::default()
        });

        let handle = engine.add_from_descriptor(&path).await?;
        handle.start().await?;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(handle.bytes_completed(), 1_000);
        Ok(())
    }

    #[tokio::test]
    async fn dropped_progress_is_resumed_on_readd() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = write_descriptor(temp.path(), "a.torrent", "alpha", u64::from(u32::MAX))?;
        let engine = SimulatedEngine::new(SimSettings {
            rate_bps: 10_000_000,
            ..SimSettings::default()
        });

        let handle = engine.add_from_descriptor(&path).await?;
        handle.start().await?;
        tokio::time::sleep(Duration::from_millis(30)).await;
        let before_drop = handle.bytes_completed();
        assert!(before_drop > 0);

        handle.drop_transfer().await;
        assert!(!handle.is_active());
        let banked = engine.banked(&path).unwrap_or_default();
        assert!(banked >= before_drop);
        assert_eq!(handle.bytes_completed(), banked);
        assert!(handle.start().await.is_err());

        let readded = engine.add_from_descriptor(&path).await?;
        assert_eq!(readded.bytes_completed(), banked);
        Ok(())
    }

    #[tokio::test]
    async fn sub_millisecond_runs_still_bank_progress() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = write_descriptor(temp.path(), "a.torrent", "alpha", u64::from(u32::MAX))?;
        let engine = SimulatedEngine::new(SimSettings {
            rate_bps: 1_000_000_000,
            ..SimSettings::default()
        });

        let handle = engine.add_from_descriptor(&path).await?;
        handle.start().await?;
        std::thread::sleep(Duration::from_micros(200));
        handle.drop_transfer().await;

        // 200 µs at 1 GB/s is at least 200 KB.
        assert!(engine.banked(&path).unwrap_or_default() >= 200_000);
        Ok(())
    }

    #[test]
    fn running_peers_split_seeders_from_active() {
        let settings = SimSettings {
            active_peers: 3,
            connected_seeders: 5,
            ..SimSettings::default()
        };
        assert_eq!(
            settings.peers(),
            PeerCounts {
                seeders: 5,
                leechers: 0
            }
        );
    }

    #[tokio::test]
    async fn unreadable_and_malformed_descriptors_are_rejected() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let engine = SimulatedEngine::default();

        let missing = engine
            .add_from_descriptor(&temp.path().join("missing.torrent"))
            .await;
        assert!(matches!(missing, Err(TorrentError::DescriptorIo { .. })));

        let broken = temp.path().join("broken.torrent");
        std::fs::write(&broken, b"garbage")?;
        let result = engine.add_from_descriptor(&broken).await;
        assert!(matches!(
            result,
            Err(TorrentError::InvalidDescriptor {
                reason: "malformed bencode",
                ..
            })
        ));
        Ok(())
    }
}
