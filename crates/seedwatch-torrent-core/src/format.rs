//! Human-readable strings for progress, speed, and remaining time.

use std::time::Duration;

use crate::rate::{Eta, MEGABYTE, bytes_to_f64};

const KIB: u64 = 1 << 10;
const MIB: u64 = 1 << 20;
const GIB: u64 = 1 << 30;
const TIB: u64 = 1 << 40;

/// Suffix and divisor for a byte count, chosen by magnitude.
#[must_use]
pub const fn byte_unit(bytes: u64) -> (&'static str, u64) {
    if bytes < KIB {
        ("B", 1)
    } else if bytes < MIB {
        ("KB", KIB)
    } else if bytes < GIB {
        ("MB", MIB)
    } else if bytes < TIB {
        ("GB", GIB)
    } else {
        ("TB", TIB)
    }
}

/// Render `completed/total` scaled to the unit picked for `total`, e.g. `1.5/3.0GB`.
#[must_use]
pub fn format_progress(completed_bytes: u64, total_bytes: u64) -> String {
    let (suffix, unit) = byte_unit(total_bytes);
    let unit = bytes_to_f64(unit);
    format!(
        "{:.1}/{:.1}{suffix}",
        bytes_to_f64(completed_bytes) / unit,
        bytes_to_f64(total_bytes) / unit
    )
}

/// Render a byte rate as megabytes per second with two decimals.
#[must_use]
pub fn format_speed(bytes_per_second: f64) -> String {
    format!("{:.2}MB/s", bytes_per_second / MEGABYTE)
}

/// Render a duration as `HH:MM:SS`; hours are not wrapped.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3_600;
    let minutes = (total / 60) % 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Render an ETA; unknown estimates use a placeholder rather than `00:00:00`.
#[must_use]
pub fn format_eta(eta: Eta) -> String {
    if eta.is_known() {
        format_duration(eta.duration())
    } else {
        "--:--:--".to_string()
    }
}
