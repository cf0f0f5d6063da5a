//! Default values applied when the operator does not override them.

use std::time::Duration;

/// Interval between tracking polls of one transfer.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Interval between scans of the watched directory.
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(5);
/// File-name pattern identifying descriptor files.
pub const DEFAULT_DESCRIPTOR_PATTERN: &str = r".+\.torrent$";
