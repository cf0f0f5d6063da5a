#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub)]

//! Event bus for transfer lifecycle notifications.
//!
//! The bus provides a typed event enum, sequential identifiers, and replay of recent events for
//! subscribers that attach late. Internally it uses `tokio::broadcast` with a bounded buffer;
//! when the channel overflows, the oldest events are dropped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::{Receiver, Sender};

/// Identifier assigned to each event emitted by the bus.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Typed lifecycle events; `index` is the record's registry position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A descriptor was accepted and its transfer started.
    TransferAdded {
        /// Registry index of the record.
        index: usize,
        /// Descriptor path.
        source_path: String,
        /// Transfer name at admission time.
        name: String,
    },
    /// The engine rejected a descriptor; the record was created aborted and dropped.
    StartFailed {
        /// Registry index of the record.
        index: usize,
        /// Descriptor path.
        source_path: String,
        /// Engine error text.
        message: String,
    },
    /// Byte counters observed by a poll cycle.
    Progress {
        /// Registry index of the record.
        index: usize,
        /// Bytes completed.
        bytes_completed: u64,
        /// Total payload bytes.
        bytes_total: u64,
    },
    /// Abort was requested for a record.
    AbortRequested {
        /// Registry index of the record.
        index: usize,
    },
    /// The engine stopped transferring without an abort request.
    TransferDropped {
        /// Registry index of the record.
        index: usize,
    },
    /// A dropped transfer was restarted with a fresh rate baseline.
    TransferRestarted {
        /// Registry index of the record.
        index: usize,
        /// Completed bytes at the moment of restart.
        baseline_bytes: u64,
    },
    /// An aborted transfer was released from the engine.
    Aborted {
        /// Registry index of the record.
        index: usize,
    },
    /// A transfer reached its total length.
    Finished {
        /// Registry index of the record.
        index: usize,
        /// Descriptor path.
        source_path: String,
    },
    /// The descriptor of a finished transfer was deleted.
    DescriptorRemoved {
        /// Registry index of the record.
        index: usize,
        /// Descriptor path.
        source_path: String,
    },
    /// The descriptor of a finished transfer could not be deleted.
    DescriptorRemovalFailed {
        /// Registry index of the record.
        index: usize,
        /// Descriptor path.
        source_path: String,
        /// Failure detail.
        message: String,
    },
}

impl Event {
    /// Machine-friendly discriminator.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TransferAdded { .. } => "transfer_added",
            Self::StartFailed { .. } => "start_failed",
            Self::Progress { .. } => "progress",
            Self::AbortRequested { .. } => "abort_requested",
            Self::TransferDropped { .. } => "transfer_dropped",
            Self::TransferRestarted { .. } => "transfer_restarted",
            Self::Aborted { .. } => "aborted",
            Self::Finished { .. } => "finished",
            Self::DescriptorRemoved { .. } => "descriptor_removed",
            Self::DescriptorRemovalFailed { .. } => "descriptor_removal_failed",
        }
    }

    /// Registry index the event refers to.
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::TransferAdded { index, .. }
            | Self::StartFailed { index, .. }
            | Self::Progress { index, .. }
            | Self::AbortRequested { index }
            | Self::TransferDropped { index }
            | Self::TransferRestarted { index, .. }
            | Self::Aborted { index }
            | Self::Finished { index, .. }
            | Self::DescriptorRemoved { index, .. }
            | Self::DescriptorRemovalFailed { index, .. } => *index,
        }
    }
}

/// Metadata wrapper tracking the event id and emission timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Sequential identifier.
    pub id: EventId,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Payload.
    pub event: Event,
}

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    buffer: Arc<Mutex<VecDeque<EventEnvelope>>>,
    next_id: Arc<AtomicU64>,
    replay_capacity: usize,
}

impl EventBus {
    /// Construct a new bus with the provided broadcast capacity.
    ///
    /// The broadcast channel uses the same capacity as the in-memory replay buffer. A zero
    /// capacity is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            next_id: Arc::new(AtomicU64::new(1)),
            replay_capacity: capacity,
        }
    }

    /// Construct a bus with the default in-memory buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Publish a new event, assigning it a sequential identifier.
    pub fn publish(&self, event: Event) -> EventId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };

        {
            let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
            if buffer.len() == self.replay_capacity {
                buffer.pop_front();
            }
            buffer.push_back(envelope.clone());
        }

        let _ = self.sender.send(envelope);
        id
    }

    /// Subscribe to the bus, replaying any buffered events newer than `since_id`.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<EventId>) -> EventStream {
        let mut backlog = VecDeque::new();
        // Subscribe before reading the ring so nothing published in between is missed; the
        // stream skips live envelopes already yielded from the backlog.
        let receiver = self.sender.subscribe();
        if let Some(since) = since_id {
            let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
            backlog.extend(buffer.iter().filter(|item| item.id > since).cloned());
        }
        let replayed_through = backlog.back().map_or(0, |envelope| envelope.id);
        EventStream {
            backlog,
            receiver,
            replayed_through,
        }
    }

    /// Returns the last assigned identifier, if any events remain buffered.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.back().map(|event| event.id)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream yielding events from the replay backlog, then from the live channel.
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    receiver: Receiver<EventEnvelope>,
    replayed_through: EventId,
}

impl EventStream {
    /// Receive the next event, respecting the replay backlog first.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }

        loop {
            match self.receiver.recv().await {
                Ok(event) if event.id <= self.replayed_through => {}
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;
    use tokio::task;
    use tokio::time::timeout;

    const RECV_TIMEOUT: Duration = Duration::from_secs(1);

    fn sample_progress_event(index: usize) -> Event {
        Event::Progress {
            index,
            bytes_completed: (index * 1_000) as u64,
            bytes_total: 500_000,
        }
    }

    #[tokio::test]
    async fn sequential_ids_and_replay() {
        let bus = EventBus::with_capacity(16);

        let mut last_id = 0;
        for i in 0..5 {
            last_id = bus.publish(sample_progress_event(i));
        }
        assert_eq!(last_id, 5);

        let mut stream = bus.subscribe(Some(2));
        let mut received = Vec::new();
        for _ in 0..3 {
            if let Some(event) = stream.next().await {
                received.push(event);
            }
        }

        assert_eq!(received.len(), 3);
        assert_eq!(received.first().map(|event| event.id), Some(3));
        assert_eq!(received.last().map(|event| event.id), Some(5));
    }

    #[tokio::test]
    async fn replay_is_not_duplicated_by_live_channel() {
        let bus = EventBus::with_capacity(16);
        bus.publish(sample_progress_event(0));
        let mut stream = bus.subscribe(Some(0));
        bus.publish(sample_progress_event(1));

        let first = timeout(RECV_TIMEOUT, stream.next()).await.ok().flatten();
        let second = timeout(RECV_TIMEOUT, stream.next()).await.ok().flatten();
        assert_eq!(first.map(|event| event.id), Some(1));
        assert_eq!(second.map(|event| event.id), Some(2));
    }

    #[tokio::test]
    async fn ring_drops_oldest_when_full() {
        let bus = EventBus::with_capacity(2);
        for i in 0..4 {
            bus.publish(sample_progress_event(i));
        }
        assert_eq!(bus.last_event_id(), Some(4));

        let mut stream = bus.subscribe(Some(0));
        let first = timeout(RECV_TIMEOUT, stream.next()).await.ok().flatten();
        assert_eq!(first.map(|event| event.id), Some(3));
    }

    #[tokio::test]
    async fn concurrent_publishers_reach_subscriber() {
        let bus = Arc::new(EventBus::with_capacity(512));
        let mut stream = bus.subscribe(None);

        let publisher = {
            let bus = Arc::clone(&bus);
            task::spawn(async move {
                for i in 0..200 {
                    bus.publish(sample_progress_event(i));
                }
            })
        };

        let consumer = task::spawn(async move {
            let mut ids = HashSet::new();
            while ids.len() < 200 {
                match stream.next().await {
                    Some(event) => {
                        ids.insert(event.id);
                    }
                    None => break,
                }
            }
            ids
        });

        publisher.await.expect("publisher task panicked");
        let ids = timeout(Duration::from_secs(5), consumer)
            .await
            .expect("consumer timed out")
            .expect("consumer task panicked");
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn events_serialize_with_snake_case_tag() {
        let event = Event::Finished {
            index: 3,
            source_path: "/watch/a.torrent".into(),
        };
        let value = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(value["type"], "finished");
        assert_eq!(value["index"], 3);
        assert_eq!(event.kind(), "finished");
        assert_eq!(event.index(), 3);
    }
}
