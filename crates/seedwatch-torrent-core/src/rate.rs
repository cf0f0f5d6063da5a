//! Throughput and remaining-time estimation.
//!
//! All functions are pure: callers supply the byte counters and the elapsed window measured
//! from the current baseline.

use std::time::Duration;

/// Bytes per display megabyte.
pub const MEGABYTE: f64 = 1024.0 * 1024.0;

/// Estimated time until completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eta {
    /// No throughput has been measured in the current window.
    Unknown,
    /// Time remaining at the measured throughput.
    Remaining(Duration),
}

impl Eta {
    /// Duration view of the estimate; `Unknown` collapses to zero.
    #[must_use]
    pub const fn duration(self) -> Duration {
        match self {
            Self::Unknown => Duration::ZERO,
            Self::Remaining(duration) => duration,
        }
    }

    /// Whether a throughput measurement backs this estimate.
    #[must_use]
    pub const fn is_known(self) -> bool {
        matches!(self, Self::Remaining(_))
    }
}

/// Bytes per second transferred since `baseline_bytes`, over `elapsed`.
///
/// Returns zero for an empty window or when no bytes were gained.
#[must_use]
pub fn throughput_bps(completed_bytes: u64, baseline_bytes: u64, elapsed: Duration) -> f64 {
    if elapsed.is_zero() {
        return 0.0;
    }
    let gained = completed_bytes.saturating_sub(baseline_bytes);
    if gained == 0 {
        return 0.0;
    }
    bytes_to_f64(gained) / elapsed.as_secs_f64()
}

/// Remaining time for `remaining_bytes` at `bytes_per_second`.
#[must_use]
pub fn estimate_eta(remaining_bytes: u64, bytes_per_second: f64) -> Eta {
    if bytes_per_second.is_nan() || bytes_per_second <= 0.0 {
        return Eta::Unknown;
    }
    Duration::try_from_secs_f64(bytes_to_f64(remaining_bytes) / bytes_per_second)
        .map_or(Eta::Unknown, Eta::Remaining)
}

pub(crate) const fn bytes_to_f64(value: u64) -> f64 {
    #[expect(
        clippy::cast_precision_loss,
        reason = "byte counters are only converted for user-facing rates and ratios"
    )]
    {
        value as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_elapsed_yields_zero_throughput() {
        assert!(throughput_bps(10_000, 0, Duration::ZERO).abs() < f64::EPSILON);
    }

    #[test]
    fn unchanged_counter_yields_zero_throughput() {
        assert!(throughput_bps(4_096, 4_096, Duration::from_secs(5)).abs() < f64::EPSILON);
    }

    #[test]
    fn counter_below_baseline_yields_zero_throughput() {
        assert!(throughput_bps(100, 4_096, Duration::from_secs(5)).abs() < f64::EPSILON);
    }

    #[test]
    fn throughput_is_measured_from_baseline() {
        let rate = throughput_bps(3_000, 1_000, Duration::from_secs(4));
        assert!((rate - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_throughput_yields_unknown_zero_duration_eta() {
        for remaining in [0, 1, 1_000_000_000] {
            let eta = estimate_eta(remaining, 0.0);
            assert_eq!(eta, Eta::Unknown);
            assert_eq!(eta.duration(), Duration::ZERO);
            assert!(!eta.is_known());
        }
    }

    #[test]
    fn negative_or_nan_throughput_is_unknown() {
        assert_eq!(estimate_eta(10, -1.0), Eta::Unknown);
        assert_eq!(estimate_eta(10, f64::NAN), Eta::Unknown);
    }

    #[test]
    fn eta_divides_remaining_by_throughput() {
        let eta = estimate_eta(10_000, 1_000.0);
        assert_eq!(eta, Eta::Remaining(Duration::from_secs(10)));
        assert!(eta.is_known());
    }
}
