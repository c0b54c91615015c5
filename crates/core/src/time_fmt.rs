// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time helpers

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as epoch milliseconds.
///
/// Event timestamps are wall-clock for display; durations are always
/// measured with `Instant` at the call sites.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Format a millisecond duration for human output: `850ms`, `4.2s`, `2m03s`.
pub fn format_elapsed_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        let total_secs = ms / 1000;
        format!("{}m{:02}s", total_secs / 60, total_secs % 60)
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
