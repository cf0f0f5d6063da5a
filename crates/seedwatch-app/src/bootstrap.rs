//! Supervisor bootstrap: wires the watcher, registry, and ingestion bridge together and tears
//! them down on shutdown.
//!
//! Every lifecycle event published on the bus is also logged at debug level, so
//! `RUST_LOG=seedwatch=debug` shows the full event history of a run.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use seedwatch_config::WatchConfig;
use seedwatch_events::{EventBus, EventStream};
use seedwatch_fsops::{DescriptorFilter, DirectoryWatcher, initial_listing};
use seedwatch_runtime::LifecycleRegistry;
use seedwatch_telemetry::GlobalContextGuard;
use seedwatch_torrent_core::{TransferEngine, error_chain};
use seedwatch_torrent_sim::SimulatedEngine;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::cli::Cli;
use crate::error::{AppError, AppResult};
use crate::ingest::IngestionBridge;

/// Upper bound on each shutdown phase.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Parse the command line, install logging, and supervise until Ctrl-C or a fatal error.
///
/// # Errors
///
/// Returns an error when logging cannot be installed, the configuration is invalid, the watcher
/// cannot start, or the watcher fails while running.
pub async fn run_app() -> AppResult<()> {
    let cli = Cli::from_env();
    seedwatch_telemetry::init_logging(&cli.logging_config())
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("supervisor");

    info!("seedwatch starting");
    let result = run_with(&cli).await;
    if let Err(err) = &result {
        error!(error = %error_chain(err), "seedwatch stopped on a fatal error");
    }
    result
}

async fn run_with(cli: &Cli) -> AppResult<()> {
    let config = cli
        .watch_config()
        .map_err(|err| AppError::config("cli.watch_config", err))?;

    let settings = cli.sim_settings();
    warn!(
        rate_bps = settings.rate_bps,
        "using the simulated transfer engine; no peer traffic takes place"
    );
    let engine = Arc::new(SimulatedEngine::new(settings));

    Supervisor::start(&config, engine, EventBus::new())?
        .run_until(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "ctrl-c handler unavailable; running until the watcher stops");
        std::future::pending::<()>().await;
    }
}

/// A running supervisor: directory watcher, ingestion task, and lifecycle registry.
pub struct Supervisor {
    registry: LifecycleRegistry,
    watcher: DirectoryWatcher,
    ingest: JoinHandle<AppResult<()>>,
    event_log: JoinHandle<usize>,
}

impl Supervisor {
    /// Start watching `config.watch_dir` and ingesting descriptors into a fresh registry.
    ///
    /// The watcher is attached before the directory is listed, so a file arriving in between
    /// is reported at least once.
    ///
    /// # Errors
    ///
    /// Returns an error when the pattern is invalid or the directory cannot be watched or listed.
    pub fn start(
        config: &WatchConfig,
        engine: Arc<dyn TransferEngine>,
        events: EventBus,
    ) -> AppResult<Self> {
        let pattern = config
            .descriptor_regex()
            .map_err(|err| AppError::config("config.descriptor_regex", err))?;
        let filter = DescriptorFilter::from_regex(pattern);

        let (watcher, live) =
            DirectoryWatcher::start(&config.watch_dir, filter.clone(), config.watch_interval)
                .map_err(|err| AppError::fsops("watcher.start", err))?;
        let initial = initial_listing(&config.watch_dir, &filter)
            .map_err(|err| AppError::fsops("initial_listing", err))?;

        let event_log = tokio::spawn(log_events(events.subscribe(None)));
        let registry = LifecycleRegistry::new(engine, events, config.tracker);
        let ingest = IngestionBridge::new(registry.clone(), config).spawn(initial, live);
        info!(
            watch_dir = %watcher.dir().display(),
            poll_interval_ms = config.tracker.poll_interval.as_millis(),
            "supervisor started"
        );
        Ok(Self {
            registry,
            watcher,
            ingest,
            event_log,
        })
    }

    /// Registry the supervisor feeds.
    #[must_use]
    pub const fn registry(&self) -> &LifecycleRegistry {
        &self.registry
    }

    /// Run until `shutdown` resolves or ingestion ends, then abort every transfer.
    ///
    /// # Errors
    ///
    /// Returns `Watcher` when the watcher failed and `IngestJoin` when the ingestion task did
    /// not complete normally.
    pub async fn run_until<F>(self, shutdown: F) -> AppResult<()>
    where
        F: Future<Output = ()>,
    {
        let Self {
            registry,
            watcher,
            mut ingest,
            event_log,
        } = self;

        let outcome = tokio::select! {
            () = shutdown => {
                info!("shutdown requested");
                // Stopping the watcher closes the live stream so ingestion drains and exits.
                watcher.stop();
                match timeout(SHUTDOWN_GRACE, &mut ingest).await {
                    Ok(joined) => flatten_join(joined),
                    Err(_) => {
                        warn!("ingestion did not drain in time; cancelling it");
                        ingest.abort();
                        Ok(())
                    }
                }
            }
            joined = &mut ingest => {
                watcher.stop();
                flatten_join(joined)
            }
        };

        for path in registry.active_paths() {
            info!(descriptor = %path.display(), "aborting transfer for shutdown");
        }
        let aborted = registry.abort_all();
        info!(aborted, "aborting active transfers");
        match timeout(SHUTDOWN_GRACE, registry.join_tracking()).await {
            Ok(joined) => info!(joined, "tracking tasks stopped"),
            Err(_) => warn!("tracking tasks did not stop within the grace period"),
        }
        event_log.abort();
        info!(
            records = registry.len(),
            last_event_id = ?registry.events().last_event_id(),
            "supervisor stopped"
        );
        outcome
    }
}

/// Log each event from `stream` until the bus closes; returns how many were logged.
async fn log_events(mut stream: EventStream) -> usize {
    let mut logged = 0;
    while let Some(envelope) = stream.next().await {
        logged += 1;
        debug!(
            id = envelope.id,
            kind = envelope.event.kind(),
            index = envelope.event.index(),
            "lifecycle event"
        );
    }
    logged
}

fn flatten_join(joined: Result<AppResult<()>, JoinError>) -> AppResult<()> {
    joined.map_err(|source| AppError::IngestJoin { source })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedwatch_events::Event;

    #[tokio::test]
    async fn event_log_consumes_until_the_bus_closes() -> anyhow::Result<()> {
        let bus = EventBus::with_capacity(8);
        let stream = bus.subscribe(None);
        bus.publish(Event::AbortRequested { index: 0 });
        bus.publish(Event::Aborted { index: 0 });
        drop(bus);

        let logged = timeout(Duration::from_secs(1), log_events(stream)).await?;
        assert_eq!(logged, 2);
        Ok(())
    }
}
