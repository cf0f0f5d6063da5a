//! Per-transfer tracking loop.
//!
//! One loop runs per started transfer until its record becomes terminal. Every cycle takes a
//! single observation under the record lock, decides one step from it, performs any engine or
//! filesystem work with no lock held, and then sleeps until the next poll or an abort request.

use std::path::PathBuf;
use std::sync::Arc;

use seedwatch_events::Event;
use seedwatch_torrent_core::{PeerCounts, ProgressSnapshot, TransferHandle};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, instrument, warn};

use crate::record::RecordId;
use crate::registry::{RecordSlot, RegistryShared};

/// Byte count and instant that throughput is measured from.
#[derive(Debug, Clone, Copy)]
struct Baseline {
    bytes: u64,
    at: Instant,
}

impl Baseline {
    fn now(bytes: u64) -> Self {
        Self {
            bytes,
            at: Instant::now(),
        }
    }
}

struct Observation {
    aborted: bool,
    dropped: bool,
    finished: bool,
    newly_dropped: bool,
    completed: u64,
    total: Option<u64>,
    peers: PeerCounts,
}

#[derive(Debug, PartialEq, Eq)]
enum Step {
    Release,
    Settle,
    Finish { total: u64 },
    Restart,
    Report { total: u64 },
    AwaitMetadata,
    Exit,
}

fn decide(observation: &Observation) -> Step {
    if observation.finished {
        return Step::Exit;
    }
    if observation.aborted {
        return if observation.dropped {
            Step::Settle
        } else {
            Step::Release
        };
    }
    match observation.total {
        Some(total) if observation.completed >= total => Step::Finish { total },
        _ if observation.dropped => Step::Restart,
        Some(total) => Step::Report { total },
        None => Step::AwaitMetadata,
    }
}

fn observe(slot: &RecordSlot, handle: &dyn TransferHandle) -> Observation {
    let mut record = slot.record();
    let completed = handle.bytes_completed();
    let total = handle.total_length();
    let peers = handle.peer_counts();
    let newly_dropped =
        !handle.is_active() && !record.aborted && !record.finished && record.mark_dropped();
    Observation {
        aborted: record.aborted,
        dropped: record.dropped,
        finished: record.finished,
        newly_dropped,
        completed,
        total,
        peers,
    }
}

/// Drive one transfer until its record is terminal.
#[instrument(name = "tracker", skip(shared, handle), fields(index = id.index()))]
pub(crate) async fn track(shared: Arc<RegistryShared>, id: RecordId, handle: Arc<dyn TransferHandle>) {
    let index = id.index();
    let Some(slot) = shared.slot(index) else {
        return;
    };

    tokio::select! {
        () = handle.metadata_ready() => {}
        () = slot.abort_signal.notified() => {
            debug!("abort arrived before metadata");
        }
    }
    refresh_name(&slot, handle.as_ref());

    let source_path = slot.record().source_path.clone();
    let mut tracker = Tracker {
        shared,
        id,
        source_path,
        baseline: Baseline::now(handle.bytes_completed()),
        handle,
    };

    loop {
        let Some(slot) = tracker.shared.slot(index) else {
            return;
        };
        let observation = observe(&slot, tracker.handle.as_ref());
        if observation.newly_dropped {
            warn!("engine stopped the transfer; restarting next cycle");
            tracker
                .shared
                .events
                .publish(Event::TransferDropped { index });
        }

        let done = match decide(&observation) {
            Step::Release => {
                tracker.release(&slot).await;
                true
            }
            Step::Settle => {
                tracker.settle();
                true
            }
            Step::Finish { total } => tracker.finish(&slot, &observation, total).await,
            Step::Restart => tracker.restart(&slot).await,
            Step::Report { total } => {
                tracker.report(&slot, &observation, total);
                false
            }
            Step::AwaitMetadata => false,
            Step::Exit => true,
        };
        if done {
            return;
        }

        tokio::select! {
            () = sleep(tracker.shared.settings.poll_interval) => {}
            () = slot.abort_signal.notified() => {}
        }
    }
}

fn refresh_name(slot: &RecordSlot, handle: &dyn TransferHandle) {
    if let Some(name) = handle.name() {
        slot.record().set_display_name(name);
    }
}

struct Tracker {
    shared: Arc<RegistryShared>,
    id: RecordId,
    source_path: PathBuf,
    handle: Arc<dyn TransferHandle>,
    baseline: Baseline,
}

impl Tracker {
    const fn index(&self) -> usize {
        self.id.index()
    }

    async fn release(&self, slot: &RecordSlot) {
        self.handle.drop_transfer().await;
        if slot.record().mark_dropped() {
            info!(descriptor = %self.source_path.display(), "transfer aborted");
            self.shared.events.publish(Event::Aborted {
                index: self.index(),
            });
        }
    }

    /// The record became aborted while the engine had already stopped the transfer.
    fn settle(&self) {
        info!(descriptor = %self.source_path.display(), "transfer aborted");
        self.shared.events.publish(Event::Aborted {
            index: self.index(),
        });
    }

    /// Returns `true` once the record is finished; `false` when an abort won the race.
    async fn finish(&self, slot: &RecordSlot, observation: &Observation, total: u64) -> bool {
        let snapshot = self.measure(observation, total);
        let name = {
            let mut record = slot.record();
            if !record.finish(snapshot) {
                return false;
            }
            record.display_name.clone()
        };
        info!(name = %name, descriptor = %self.source_path.display(), "transfer finished");
        self.shared.events.publish(Event::Finished {
            index: self.index(),
            source_path: self.source_path.display().to_string(),
        });

        match seedwatch_fsops::remove_descriptor(&self.source_path).await {
            Ok(()) => {
                info!(descriptor = %self.source_path.display(), "descriptor removed");
                self.shared.events.publish(Event::DescriptorRemoved {
                    index: self.index(),
                    source_path: self.source_path.display().to_string(),
                });
            }
            Err(err) => {
                let message = seedwatch_torrent_core::error_chain(&err);
                warn!(
                    descriptor = %self.source_path.display(),
                    error = %message,
                    "failed to remove descriptor"
                );
                self.shared.events.publish(Event::DescriptorRemovalFailed {
                    index: self.index(),
                    source_path: self.source_path.display().to_string(),
                    message,
                });
            }
        }
        true
    }

    /// Re-add and start the transfer. Returns `true` when the loop should exit.
    async fn restart(&mut self, slot: &RecordSlot) -> bool {
        let handle = match self.shared.admit(&self.source_path).await {
            Ok(handle) => handle,
            Err(err) => {
                warn!(error = %err.describe(), "restart failed; retrying next cycle");
                return false;
            }
        };

        let baseline = Baseline::now(handle.bytes_completed());
        let restarted = {
            let mut record = slot.record();
            if let Some(name) = handle.name() {
                record.set_display_name(name);
            }
            record.clear_dropped()
        };
        self.handle = handle;
        self.baseline = baseline;

        if restarted {
            info!(baseline_bytes = baseline.bytes, "transfer restarted");
            self.shared.events.publish(Event::TransferRestarted {
                index: self.index(),
                baseline_bytes: baseline.bytes,
            });
            return false;
        }

        // Aborted while restarting: the fresh handle must not outlive the record.
        self.handle.drop_transfer().await;
        self.settle();
        true
    }

    fn report(&self, slot: &RecordSlot, observation: &Observation, total: u64) {
        let snapshot = self.measure(observation, total);
        let name = {
            let mut record = slot.record();
            if !record.set_progress(snapshot.clone()) {
                return;
            }
            record.display_name.clone()
        };
        info!(
            name = %name,
            progress = %snapshot.progress,
            seeders = snapshot.seeders,
            leechers = snapshot.leechers,
            speed = %snapshot.speed,
            eta = %snapshot.eta,
            "tracking"
        );
        self.shared.events.publish(Event::Progress {
            index: self.index(),
            bytes_completed: observation.completed,
            bytes_total: total,
        });
    }

    fn measure(&self, observation: &Observation, total: u64) -> ProgressSnapshot {
        ProgressSnapshot::measure(
            observation.completed,
            total,
            self.baseline.bytes,
            self.baseline.at.elapsed(),
            observation.peers,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation() -> Observation {
        Observation {
            aborted: false,
            dropped: false,
            finished: false,
            newly_dropped: false,
            completed: 10,
            total: Some(100),
            peers: PeerCounts::default(),
        }
    }

    #[test]
    fn abort_takes_priority_over_completion() {
        let mut obs = observation();
        obs.aborted = true;
        obs.completed = 100;
        assert_eq!(decide(&obs), Step::Release);
        obs.dropped = true;
        assert_eq!(decide(&obs), Step::Settle);
    }

    #[test]
    fn completion_takes_priority_over_restart() {
        let mut obs = observation();
        obs.dropped = true;
        obs.completed = 100;
        assert_eq!(decide(&obs), Step::Finish { total: 100 });
        obs.completed = 50;
        assert_eq!(decide(&obs), Step::Restart);
    }

    #[test]
    fn unknown_total_waits_and_known_total_reports() {
        let mut obs = observation();
        assert_eq!(decide(&obs), Step::Report { total: 100 });
        obs.total = None;
        assert_eq!(decide(&obs), Step::AwaitMetadata);
        obs.dropped = true;
        assert_eq!(decide(&obs), Step::Restart);
        obs.finished = true;
        assert_eq!(decide(&obs), Step::Exit);
    }
}
