//! Configuration types for the polling scheduler.

use serde::{Deserialize, Serialize};

/// Scheduler-wide tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Period used when a task is registered without an explicit interval,
    /// in milliseconds.
    pub default_interval_ms: u64,
    /// Lower bound on the fallback release delay for synchronous producers,
    /// in milliseconds.
    ///
    /// A producer that completes without handing back a future holds the
    /// in-progress flag for `max(min_fallback_ms, interval / 2)`.
    pub min_fallback_ms: u64,
    /// Resume suspended tasks at `default_interval_ms` instead of their
    /// originally requested interval.
    ///
    /// The legacy dashboard rescheduled every poller at a flat 60s cadence
    /// after the page became visible again. Off by default; enable only when
    /// behavioural parity with that system is required.
    pub legacy_resume_interval: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_interval_ms: 60_000,
            min_fallback_ms: 1_000,
            legacy_resume_interval: false,
        }
    }
}
