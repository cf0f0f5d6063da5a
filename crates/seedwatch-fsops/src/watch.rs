//! Polling watcher for the descriptor input directory.
//!
//! # Design
//! - A `notify::PollWatcher` scans the directory on its own thread at a fixed cadence.
//! - Raw notifications are classified, filtered by [`DescriptorFilter`], and forwarded into an
//!   unbounded tokio channel so async consumers never block the polling thread.
//! - Watcher failures travel through the same channel as `Err` items.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::descriptor::DescriptorFilter;
use crate::error::{FsOpsError, FsOpsResult};

/// Receiving end of the watcher channel.
pub type WatchReceiver = UnboundedReceiver<FsOpsResult<WatchEvent>>;

/// Change to a matching descriptor file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A descriptor appeared.
    Created(PathBuf),
    /// A descriptor was renamed or moved into place.
    Moved(PathBuf),
    /// A descriptor disappeared.
    Removed(PathBuf),
}

impl WatchEvent {
    /// Path the event refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Created(path) | Self::Moved(path) | Self::Removed(path) => path,
        }
    }

    /// Whether the event introduces a descriptor that should be ingested.
    #[must_use]
    pub const fn is_arrival(&self) -> bool {
        matches!(self, Self::Created(_) | Self::Moved(_))
    }
}

/// Running directory watcher. Dropping it (or calling [`DirectoryWatcher::stop`]) ends polling
/// and closes the channel.
pub struct DirectoryWatcher {
    dir: PathBuf,
    watcher: PollWatcher,
}

impl DirectoryWatcher {
    /// Start polling `dir` every `interval`, forwarding matching events to the returned receiver.
    ///
    /// Files already present when this returns are not reported; take the initial listing after
    /// starting the watcher so nothing slips between the two.
    ///
    /// # Errors
    ///
    /// Returns `Io` when `dir` is not an existing directory and `Watch` when the watcher cannot
    /// be created or attached.
    pub fn start(
        dir: &Path,
        filter: DescriptorFilter,
        interval: Duration,
    ) -> FsOpsResult<(Self, WatchReceiver)> {
        let metadata = std::fs::metadata(dir).map_err(|source| FsOpsError::Io {
            operation: "watch",
            path: dir.to_path_buf(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(FsOpsError::Io {
                operation: "watch",
                path: dir.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotADirectory),
            });
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let watched = dir.to_path_buf();
        let handler = move |result: notify::Result<Event>| {
            let _ = forward(&sender, &filter, &watched, result);
        };

        let config = Config::default().with_poll_interval(interval);
        let mut watcher = PollWatcher::new(handler, config).map_err(|source| FsOpsError::Watch {
            operation: "create_watcher",
            path: dir.to_path_buf(),
            source,
        })?;
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|source| FsOpsError::Watch {
                operation: "watch",
                path: dir.to_path_buf(),
                source,
            })?;

        info!(dir = %dir.display(), interval_ms = interval.as_millis(), "directory watcher started");
        Ok((
            Self {
                dir: dir.to_path_buf(),
                watcher,
            },
            receiver,
        ))
    }

    /// Directory being watched.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stop watching and release the polling thread.
    pub fn stop(mut self) {
        if let Err(err) = self.watcher.unwatch(&self.dir) {
            debug!(dir = %self.dir.display(), error = %err, "unwatch failed during stop");
        }
        info!(dir = %self.dir.display(), "directory watcher stopped");
    }
}

/// Relay one notification; returns `false` when the receiving side has gone away.
fn forward(
    sender: &UnboundedSender<FsOpsResult<WatchEvent>>,
    filter: &DescriptorFilter,
    dir: &Path,
    result: notify::Result<Event>,
) -> bool {
    let mut delivered = true;
    match result {
        Ok(event) => {
            for change in classify(event) {
                if filter.matches(change.path()) {
                    debug!(event = ?change, "descriptor change observed");
                    if let Err(returned) = sender.send(Ok(change)) {
                        debug!(dir = %dir.display(), event = ?returned.0, "watch receiver closed; change dropped");
                        delivered = false;
                    }
                }
            }
        }
        Err(source) => {
            let failure = FsOpsError::Watch {
                operation: "poll",
                path: dir.to_path_buf(),
                source,
            };
            if sender.send(Err(failure)).is_err() {
                debug!(dir = %dir.display(), "watch receiver closed; poll error dropped");
                delivered = false;
            }
        }
    }
    delivered
}

fn classify(event: Event) -> Vec<WatchEvent> {
    match event.kind {
        EventKind::Create(_) => event.paths.into_iter().map(WatchEvent::Created).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            event.paths.into_iter().map(WatchEvent::Moved).collect()
        }
        // Paths are `[from, to]`.
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event
            .paths
            .into_iter()
            .last()
            .map(WatchEvent::Moved)
            .into_iter()
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) | EventKind::Remove(_) => {
            event.paths.into_iter().map(WatchEvent::Removed).collect()
        }
        _ => Vec::new(),
    }
}
