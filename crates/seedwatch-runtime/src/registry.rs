//! Ordered, append-only registry of lifecycle records.
//!
//! # Design
//! - Records live in reference-counted slots; the structural lock guards only the slot vector,
//!   so growing it never moves a record and a resolved slot stays valid for good.
//! - Each slot carries its own record lock plus the abort signal its tracking loop waits on.
//! - No lock is held across an engine call or an `.await`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use seedwatch_config::TrackerSettings;
use seedwatch_events::{Event, EventBus};
use seedwatch_torrent_core::{TorrentResult, TransferEngine, TransferHandle};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::error::{RuntimeError, RuntimeResult};
use crate::record::{LifecycleRecord, RecordId};
use crate::tracker;

/// One registry entry: the record and the signal that wakes its tracking loop.
pub(crate) struct RecordSlot {
    record: Mutex<LifecycleRecord>,
    pub(crate) abort_signal: Notify,
}

impl RecordSlot {
    fn new(record: LifecycleRecord) -> Self {
        Self {
            record: Mutex::new(record),
            abort_signal: Notify::new(),
        }
    }

    pub(crate) fn record(&self) -> MutexGuard<'_, LifecycleRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// State shared between the registry handle and every tracking loop.
pub(crate) struct RegistryShared {
    slots: RwLock<Vec<Arc<RecordSlot>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    pub(crate) engine: Arc<dyn TransferEngine>,
    pub(crate) events: EventBus,
    pub(crate) settings: TrackerSettings,
}

impl RegistryShared {
    pub(crate) fn slot(&self, index: usize) -> Option<Arc<RecordSlot>> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
    }

    fn slots(&self) -> Vec<Arc<RecordSlot>> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Load and start a transfer; a handle that fails to start is released again.
    pub(crate) async fn admit(&self, path: &Path) -> TorrentResult<Arc<dyn TransferHandle>> {
        let handle = self.engine.add_from_descriptor(path).await?;
        if let Err(err) = handle.start().await {
            handle.drop_transfer().await;
            return Err(err);
        }
        Ok(handle)
    }
}

/// Registry of every descriptor the supervisor has accepted, in admission order.
#[derive(Clone)]
pub struct LifecycleRegistry {
    shared: Arc<RegistryShared>,
}

impl LifecycleRegistry {
    /// Construct an empty registry driving transfers through `engine`.
    #[must_use]
    pub fn new(engine: Arc<dyn TransferEngine>, events: EventBus, settings: TrackerSettings) -> Self {
        Self {
            shared: Arc::new(RegistryShared {
                slots: RwLock::new(Vec::new()),
                tasks: Mutex::new(Vec::new()),
                engine,
                events,
                settings,
            }),
        }
    }

    /// Accept a descriptor: create its record, start the transfer, and spawn its tracking loop.
    ///
    /// An engine failure does not fail the call; the record is created aborted and dropped with
    /// the error text as its display name, and no tracking loop is spawned.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyTracked` when a non-terminal record has the same source path.
    #[instrument(name = "registry.add", skip(self, path), fields(descriptor = %path.as_ref().display()))]
    pub async fn add(&self, path: impl AsRef<Path>) -> RuntimeResult<RecordId> {
        let path = path.as_ref().to_path_buf();
        let (id, slot) = self.reserve(&path)?;

        match self.shared.admit(&path).await {
            Ok(handle) => {
                let name = {
                    let mut record = slot.record();
                    if let Some(name) = handle.name() {
                        record.set_display_name(name);
                    }
                    record.display_name.clone()
                };
                info!(index = id.index(), name = %name, "transfer started");
                self.shared.events.publish(Event::TransferAdded {
                    index: id.index(),
                    source_path: path.display().to_string(),
                    name,
                });
                let task = tokio::spawn(tracker::track(Arc::clone(&self.shared), id, handle));
                self.shared
                    .tasks
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(task);
            }
            Err(err) => {
                let message = err.describe();
                slot.record().mark_start_failed(message.clone());
                warn!(index = id.index(), error = %message, "transfer failed to start");
                self.shared.events.publish(Event::StartFailed {
                    index: id.index(),
                    source_path: path.display().to_string(),
                    message,
                });
            }
        }
        Ok(id)
    }

    fn reserve(&self, path: &Path) -> RuntimeResult<(RecordId, Arc<RecordSlot>)> {
        let mut slots = self
            .shared
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let duplicate = slots.iter().any(|slot| {
            let record = slot.record();
            record.source_path == path && !record.is_terminal()
        });
        if duplicate {
            return Err(RuntimeError::AlreadyTracked {
                path: path.to_path_buf(),
            });
        }

        let index = slots.len();
        let slot = Arc::new(RecordSlot::new(LifecycleRecord::new(
            index,
            path.to_path_buf(),
        )));
        slots.push(Arc::clone(&slot));
        Ok((RecordId(index), slot))
    }

    /// Request an abort. The record's tracking loop wakes at once and releases the transfer.
    ///
    /// Returns `false` when the record was already aborted or has finished.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRecord` when `id` does not name a record.
    pub fn abort(&self, id: RecordId) -> RuntimeResult<bool> {
        let slot = self
            .shared
            .slot(id.index())
            .ok_or(RuntimeError::UnknownRecord { index: id.index() })?;
        Ok(self.abort_slot(id, &slot))
    }

    /// Request an abort for every record; returns how many changed.
    pub fn abort_all(&self) -> usize {
        self.shared
            .slots()
            .iter()
            .enumerate()
            .filter(|(index, slot)| self.abort_slot(RecordId(*index), slot))
            .count()
    }

    fn abort_slot(&self, id: RecordId, slot: &RecordSlot) -> bool {
        let changed = slot.record().request_abort();
        if changed {
            slot.abort_signal.notify_one();
            info!(index = id.index(), "abort requested");
            self.shared
                .events
                .publish(Event::AbortRequested { index: id.index() });
        }
        changed
    }

    /// Whether any record, terminal or not, was created from `path`.
    ///
    /// Ingestion uses this to tell a first arrival from the readmission of a descriptor whose
    /// earlier record is terminal. Admission itself is guarded by [`Self::add`], which rejects
    /// only paths with a live record.
    #[must_use]
    pub fn is_tracked(&self, path: &Path) -> bool {
        self.shared
            .slots()
            .iter()
            .any(|slot| slot.record().source_path == path)
    }

    /// Copy of one record.
    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<LifecycleRecord> {
        self.shared
            .slot(id.index())
            .map(|slot| slot.record().clone())
    }

    /// Copy of every record in admission order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LifecycleRecord> {
        self.shared
            .slots()
            .iter()
            .map(|slot| slot.record().clone())
            .collect()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no descriptor has been accepted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Paths of every non-terminal record.
    #[must_use]
    pub fn active_paths(&self) -> Vec<PathBuf> {
        self.shared
            .slots()
            .iter()
            .filter_map(|slot| {
                let record = slot.record();
                (!record.is_terminal()).then(|| record.source_path.clone())
            })
            .collect()
    }

    /// Event bus the registry publishes to.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.shared.events
    }

    /// Wait for every tracking loop spawned so far to exit; returns how many were joined.
    pub async fn join_tracking(&self) -> usize {
        let tasks: Vec<JoinHandle<()>> = std::mem::take(
            &mut *self
                .shared
                .tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let count = tasks.len();
        for task in tasks {
            if let Err(err) = task.await {
                warn!(error = %err, "tracking task ended abnormally");
            }
        }
        count
    }
}
