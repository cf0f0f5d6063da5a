//! Scripted transfer engine whose handles are driven directly by tests.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use seedwatch_torrent_core::{
    PeerCounts, TorrentError, TorrentResult, TransferEngine, TransferHandle,
};
use tokio::sync::Notify;

#[derive(Default)]
struct Script {
    failures: HashMap<PathBuf, String>,
    totals: HashMap<PathBuf, u64>,
    hold_metadata: bool,
    admission_delay: Duration,
    handles: Vec<(PathBuf, Arc<ScriptedTransfer>)>,
}

/// Engine double. Every admitted descriptor yields a [`ScriptedTransfer`] the test can steer.
///
/// Defaults: metadata is known at once, the total length is 1000 bytes, the name is the file
/// stem, and a re-added descriptor resumes from the completed bytes of its previous handle.
pub struct ScriptedEngine {
    script: Mutex<Script>,
    default_total: u64,
    adds: AtomicUsize,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedEngine {
    /// Engine whose transfers total 1000 bytes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_default_total(1_000)
    }

    /// Engine whose transfers total `total` bytes unless overridden per path.
    #[must_use]
    pub fn with_default_total(total: u64) -> Self {
        Self {
            script: Mutex::new(Script::default()),
            default_total: total,
            adds: AtomicUsize::new(0),
        }
    }

    /// Reject future admissions of `path` with `message`.
    pub fn fail_path(&self, path: &Path, message: &str) {
        self.script()
            .failures
            .insert(path.to_path_buf(), message.to_string());
    }

    /// Accept future admissions of `path` again.
    pub fn heal_path(&self, path: &Path) {
        self.script().failures.remove(path);
    }

    /// Override the total length reported for `path`.
    pub fn set_total(&self, path: &Path, total: u64) {
        self.script().totals.insert(path.to_path_buf(), total);
    }

    /// New handles keep metadata unknown until [`ScriptedTransfer::release_metadata`].
    pub fn hold_metadata(&self) {
        self.script().hold_metadata = true;
    }

    /// Make every later admission wait `delay` before it resolves.
    pub fn delay_admissions(&self, delay: Duration) {
        self.script().admission_delay = delay;
    }

    /// Number of admission attempts, successful or not.
    #[must_use]
    pub fn add_count(&self) -> usize {
        self.adds.load(Ordering::SeqCst)
    }

    /// Every handle created for `path`, oldest first.
    #[must_use]
    pub fn handles_for(&self, path: &Path) -> Vec<Arc<ScriptedTransfer>> {
        self.script()
            .handles
            .iter()
            .filter(|(candidate, _)| candidate == path)
            .map(|(_, handle)| Arc::clone(handle))
            .collect()
    }

    /// Most recent handle created for `path`.
    #[must_use]
    pub fn latest(&self, path: &Path) -> Option<Arc<ScriptedTransfer>> {
        self.handles_for(path).pop()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TransferEngine for ScriptedEngine {
    async fn add_from_descriptor(&self, path: &Path) -> TorrentResult<Arc<dyn TransferHandle>> {
        self.adds.fetch_add(1, Ordering::SeqCst);
        let delay = self.script().admission_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut script = self.script();
        if let Some(message) = script.failures.get(path) {
            return Err(TorrentError::OperationFailed {
                operation: "add_from_descriptor",
                descriptor: Some(path.to_path_buf()),
                source: Box::new(io::Error::other(message.clone())),
            });
        }

        let resumed = script
            .handles
            .iter()
            .rev()
            .find(|(candidate, _)| candidate == path)
            .map_or(0, |(_, previous)| previous.bytes_completed());
        let total = script
            .totals
            .get(path)
            .copied()
            .unwrap_or(self.default_total);
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
        let handle = Arc::new(ScriptedTransfer::new(
            name,
            total,
            resumed,
            !script.hold_metadata,
        ));
        script.handles.push((path.to_path_buf(), Arc::clone(&handle)));
        Ok(handle)
    }
}

/// Transfer handle whose counters and activity are set by the test.
pub struct ScriptedTransfer {
    name: Mutex<Option<String>>,
    total: u64,
    completed: AtomicU64,
    active: AtomicBool,
    metadata_known: AtomicBool,
    metadata: Notify,
    peers: Mutex<PeerCounts>,
    starts: AtomicUsize,
    drops: AtomicUsize,
}

impl ScriptedTransfer {
    fn new(name: Option<String>, total: u64, completed: u64, metadata_known: bool) -> Self {
        Self {
            name: Mutex::new(name),
            total,
            completed: AtomicU64::new(completed),
            active: AtomicBool::new(false),
            metadata_known: AtomicBool::new(metadata_known),
            metadata: Notify::new(),
            peers: Mutex::new(PeerCounts::default()),
            starts: AtomicUsize::new(0),
            drops: AtomicUsize::new(0),
        }
    }

    /// Set the completed byte counter.
    pub fn set_completed(&self, bytes: u64) {
        self.completed.store(bytes, Ordering::SeqCst);
    }

    /// Flip the engine-side activity flag, e.g. to simulate the engine dropping the transfer.
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// Set the peer counts reported while polling.
    pub fn set_peers(&self, peers: PeerCounts) {
        *self.peers.lock().unwrap_or_else(PoisonError::into_inner) = peers;
    }

    /// Replace the reported name.
    pub fn set_name(&self, name: &str) {
        *self.name.lock().unwrap_or_else(PoisonError::into_inner) = Some(name.to_string());
    }

    /// Mark metadata as known and wake waiters.
    pub fn release_metadata(&self) {
        self.metadata_known.store(true, Ordering::SeqCst);
        self.metadata.notify_waiters();
    }

    /// Number of `start` calls received.
    #[must_use]
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Number of `drop_transfer` calls received.
    #[must_use]
    pub fn drop_count(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransferHandle for ScriptedTransfer {
    fn name(&self) -> Option<String> {
        if self.metadata_known.load(Ordering::SeqCst) {
            self.name
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        } else {
            None
        }
    }

    async fn metadata_ready(&self) {
        loop {
            let notified = self.metadata.notified();
            if self.metadata_known.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }

    async fn start(&self) -> TorrentResult<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn drop_transfer(&self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
        self.active.store(false, Ordering::SeqCst);
    }

    fn bytes_completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    fn total_length(&self) -> Option<u64> {
        self.metadata_known
            .load(Ordering::SeqCst)
            .then_some(self.total)
    }

    fn peer_counts(&self) -> PeerCounts {
        *self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
