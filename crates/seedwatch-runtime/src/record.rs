//! State of one tracked transfer.
//!
//! # Design
//! - Mutators are crate-private and enforce the flag invariants themselves: a finished record
//!   never changes again, an aborted record never finishes, and only an unfinished record can be
//!   aborted.
//! - Each mutator reports whether it changed anything so callers log and publish exactly once.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use seedwatch_torrent_core::ProgressSnapshot;
use serde::Serialize;

/// Stable handle of a record: its position in the registry at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordId(pub(crate) usize);

impl RecordId {
    /// Registry position.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Snapshot of one tracked transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleRecord {
    /// Registry position at creation.
    pub index: usize,
    /// Descriptor the transfer was created from.
    pub source_path: PathBuf,
    /// Transfer name, or the engine error text when admission failed.
    pub display_name: String,
    /// Last measured progress; `None` until the first reporting cycle.
    pub progress: Option<ProgressSnapshot>,
    /// Payload fully transferred.
    pub finished: bool,
    /// Abort requested.
    pub aborted: bool,
    /// Engine handle not actively transferring.
    pub dropped: bool,
    /// Creation time.
    pub added_at: DateTime<Utc>,
    /// Time of the last mutation.
    pub updated_at: DateTime<Utc>,
}

impl LifecycleRecord {
    pub(crate) fn new(index: usize, source_path: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            index,
            display_name: placeholder_name(&source_path),
            source_path,
            progress: None,
            finished: false,
            aborted: false,
            dropped: false,
            added_at: now,
            updated_at: now,
        }
    }

    /// Record identifier.
    #[must_use]
    pub const fn id(&self) -> RecordId {
        RecordId(self.index)
    }

    /// Finished, or aborted and released. A terminal record has no running tracking loop.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.finished || (self.aborted && self.dropped)
    }

    pub(crate) fn set_display_name(&mut self, name: String) -> bool {
        if self.finished || self.display_name == name {
            return false;
        }
        self.display_name = name;
        self.touch();
        true
    }

    pub(crate) fn set_progress(&mut self, snapshot: ProgressSnapshot) -> bool {
        if self.finished {
            return false;
        }
        self.progress = Some(snapshot);
        self.touch();
        true
    }

    /// Store the final snapshot and finish, unless an abort got there first.
    pub(crate) fn finish(&mut self, snapshot: ProgressSnapshot) -> bool {
        if self.finished || self.aborted {
            return false;
        }
        self.progress = Some(snapshot);
        self.finished = true;
        self.touch();
        true
    }

    pub(crate) fn request_abort(&mut self) -> bool {
        if self.finished || self.aborted {
            return false;
        }
        self.aborted = true;
        self.touch();
        true
    }

    pub(crate) fn mark_dropped(&mut self) -> bool {
        if self.finished || self.dropped {
            return false;
        }
        self.dropped = true;
        if let Some(progress) = self.progress.as_mut() {
            progress.zero_activity();
        }
        self.touch();
        true
    }

    /// Clear `dropped` after a restart. Aborted records stay dropped.
    pub(crate) fn clear_dropped(&mut self) -> bool {
        if self.finished || self.aborted || !self.dropped {
            return false;
        }
        self.dropped = false;
        self.touch();
        true
    }

    pub(crate) fn mark_start_failed(&mut self, message: String) {
        if self.finished {
            return;
        }
        self.display_name = message;
        self.aborted = true;
        self.dropped = true;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn placeholder_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedwatch_torrent_core::PeerCounts;
    use std::time::Duration;

    fn record() -> LifecycleRecord {
        LifecycleRecord::new(3, PathBuf::from("/watch/alpha.torrent"))
    }

    fn snapshot() -> ProgressSnapshot {
        ProgressSnapshot::measure(
            500,
            1_000,
            0,
            Duration::from_secs(1),
            PeerCounts {
                seeders: 2,
                leechers: 1,
            },
        )
    }

    #[test]
    fn new_record_is_active_and_named_after_file() {
        let record = record();
        assert_eq!(record.id(), RecordId(3));
        assert_eq!(record.id().to_string(), "#3");
        assert_eq!(record.display_name, "alpha.torrent");
        assert!(record.progress.is_none());
        assert!(!record.is_terminal());
    }

    #[test]
    fn finished_record_rejects_further_mutation() {
        let mut record = record();
        assert!(record.finish(snapshot()));
        let frozen = record.clone();

        assert!(!record.finish(snapshot()));
        assert!(!record.request_abort());
        assert!(!record.mark_dropped());
        assert!(!record.set_progress(snapshot()));
        assert!(!record.set_display_name("other".into()));
        record.mark_start_failed("late failure".into());
        assert_eq!(record, frozen);
        assert!(record.is_terminal());
        assert!(!record.aborted);
    }

    #[test]
    fn aborted_record_never_finishes() {
        let mut record = record();
        assert!(record.request_abort());
        assert!(!record.request_abort());
        assert!(!record.finish(snapshot()));
        assert!(!record.finished);
        assert!(!record.is_terminal());

        assert!(record.mark_dropped());
        assert!(!record.mark_dropped());
        assert!(!record.clear_dropped());
        assert!(record.is_terminal());
    }

    #[test]
    fn transient_drop_zeroes_activity_and_can_be_cleared() {
        let mut record = record();
        record.set_progress(snapshot());
        assert!(record.mark_dropped());
        let progress = record.progress.clone().unwrap_or_else(snapshot);
        assert_eq!(progress.seeders, 0);
        assert_eq!(progress.leechers, 0);
        assert_eq!(progress.speed, "0.00MB/s");
        assert_eq!(progress.progress, "500.0/1000.0B");
        assert!(!record.is_terminal());

        assert!(record.clear_dropped());
        assert!(!record.clear_dropped());
        assert!(!record.dropped);
    }

    #[test]
    fn start_failure_is_terminal_with_error_text() {
        let mut record = record();
        record.mark_start_failed("invalid torrent descriptor".into());
        assert_eq!(record.display_name, "invalid torrent descriptor");
        assert!(record.aborted && record.dropped);
        assert!(record.is_terminal());
    }
}
