//! Feeds descriptor paths from the directory watcher into the lifecycle registry.
//!
//! # Design
//! - The startup listing is drained before any live event so each source keeps its order.
//! - Re-announcing a path that already has an active record is expected and ignored.
//! - A path whose earlier record is terminal is admitted again as a new record.
//! - A watcher error ends the bridge; the caller treats that as fatal.

use std::path::{Path, PathBuf};

use seedwatch_config::WatchConfig;
use seedwatch_fsops::{FsOpsResult, WatchEvent, WatchReceiver};
use seedwatch_runtime::{LifecycleRegistry, RuntimeError};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, instrument, warn};

use crate::error::{AppError, AppResult};

/// Bridge from watcher output to `LifecycleRegistry::add`.
#[derive(Clone)]
pub struct IngestionBridge {
    registry: LifecycleRegistry,
    watch_dir: PathBuf,
    output_dir: PathBuf,
}

impl IngestionBridge {
    /// Construct a bridge feeding `registry`.
    #[must_use]
    pub fn new(registry: LifecycleRegistry, config: &WatchConfig) -> Self {
        Self {
            registry,
            watch_dir: config.watch_dir.clone(),
            output_dir: config.output_dir.clone(),
        }
    }

    /// Run the bridge on its own task.
    #[must_use]
    pub fn spawn(self, initial: Vec<PathBuf>, live: WatchReceiver) -> JoinHandle<AppResult<()>> {
        tokio::spawn(self.run(initial, live))
    }

    /// Ingest `initial` in order, then every live event until the watcher channel closes.
    ///
    /// # Errors
    ///
    /// Returns `Watcher` when the live stream yields an error.
    #[instrument(name = "ingest", skip_all, fields(watch_dir = %self.watch_dir.display()))]
    pub async fn run(self, initial: Vec<PathBuf>, live: WatchReceiver) -> AppResult<()> {
        info!(
            output_dir = %self.output_dir.display(),
            initial = initial.len(),
            "ingestion started"
        );
        let listed = tokio_stream::iter(
            initial
                .into_iter()
                .map(|path| FsOpsResult::Ok(WatchEvent::Created(path))),
        );
        let mut events = listed.chain(UnboundedReceiverStream::new(live));

        while let Some(item) = events.next().await {
            let event = item.map_err(|source| AppError::Watcher { source })?;
            if event.is_arrival() {
                self.ingest(event.path()).await;
            } else {
                debug!(descriptor = %event.path().display(), "descriptor left the watched directory");
            }
        }
        info!("watcher stream closed");
        Ok(())
    }

    async fn ingest(&self, path: &Path) {
        let seen = self.registry.is_tracked(path);
        match self.registry.add(path).await {
            Ok(id) if seen => {
                info!(descriptor = %path.display(), index = id.index(), "descriptor readmitted");
            }
            Ok(id) => debug!(descriptor = %path.display(), index = id.index(), "descriptor ingested"),
            Err(RuntimeError::AlreadyTracked { .. }) => {
                debug!(descriptor = %path.display(), "descriptor already tracked");
            }
            Err(err) => warn!(descriptor = %path.display(), error = %err, "descriptor not ingested"),
        }
    }
}
