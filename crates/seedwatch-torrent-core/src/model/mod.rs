//! Progress DTOs shared between the engine boundary and the runtime registry.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::format::{format_eta, format_progress, format_speed};
use crate::rate::{estimate_eta, throughput_bps};

/// Peers currently connected to a transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerCounts {
    /// Connected peers holding the complete payload.
    pub seeders: u32,
    /// Connected peers still downloading.
    pub leechers: u32,
}

impl PeerCounts {
    /// Split an active peer count into seeders and leechers.
    #[must_use]
    pub const fn from_active(active_peers: u32, connected_seeders: u32) -> Self {
        Self {
            seeders: connected_seeders,
            leechers: active_peers.saturating_sub(connected_seeders),
        }
    }
}

/// Formatted view of one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// `completed/total` with a shared unit suffix.
    pub progress: String,
    /// Connected seeders.
    pub seeders: u32,
    /// Connected leechers.
    pub leechers: u32,
    /// Throughput since the current baseline, in MB/s.
    pub speed: String,
    /// Remaining time at the measured throughput.
    pub eta: String,
}

impl ProgressSnapshot {
    /// Measure throughput from the baseline window and format every field.
    #[must_use]
    pub fn measure(
        completed_bytes: u64,
        total_bytes: u64,
        baseline_bytes: u64,
        elapsed: Duration,
        peers: PeerCounts,
    ) -> Self {
        let rate = throughput_bps(completed_bytes, baseline_bytes, elapsed);
        let eta = estimate_eta(total_bytes.saturating_sub(completed_bytes), rate);
        Self {
            progress: format_progress(completed_bytes, total_bytes),
            seeders: peers.seeders,
            leechers: peers.leechers,
            speed: format_speed(rate),
            eta: format_eta(eta),
        }
    }

    /// Clear the live fields once the transfer stops moving.
    pub fn zero_activity(&mut self) {
        self.seeders = 0;
        self.leechers = 0;
        self.speed = format_speed(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leechers_exclude_connected_seeders() {
        assert_eq!(
            PeerCounts::from_active(7, 3),
            PeerCounts {
                seeders: 3,
                leechers: 4
            }
        );
        assert_eq!(PeerCounts::from_active(1, 3).leechers, 0);
    }

    #[test]
    fn measure_formats_every_field() {
        let snapshot = ProgressSnapshot::measure(
            3 * 1024 * 1024,
            4 * 1024 * 1024,
            1024 * 1024,
            Duration::from_secs(2),
            PeerCounts {
                seeders: 2,
                leechers: 5,
            },
        );
        assert_eq!(snapshot.progress, "3.0/4.0MB");
        assert_eq!(snapshot.speed, "1.00MB/s");
        assert_eq!(snapshot.eta, "00:00:01");
        assert_eq!(snapshot.seeders, 2);
        assert_eq!(snapshot.leechers, 5);
    }

    #[test]
    fn measure_without_gain_reports_unknown_eta() {
        let snapshot =
            ProgressSnapshot::measure(10, 100, 10, Duration::ZERO, PeerCounts::default());
        assert_eq!(snapshot.speed, "0.00MB/s");
        assert_eq!(snapshot.eta, "--:--:--");
    }

    #[test]
    fn zero_activity_keeps_progress() {
        let mut snapshot = ProgressSnapshot::measure(
            50,
            100,
            0,
            Duration::from_secs(1),
            PeerCounts::from_active(4, 1),
        );
        snapshot.zero_activity();
        assert_eq!(snapshot.progress, "50.0/100.0B");
        assert_eq!(snapshot.seeders, 0);
        assert_eq!(snapshot.leechers, 0);
        assert_eq!(snapshot.speed, "0.00MB/s");
    }
}
