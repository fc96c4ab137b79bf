//! Error types for the polling scheduler.

/// Top-level error type for the polling layer.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// Producer invocation failed (network fetch, parse, render).
    #[error("producer error: {0}")]
    Producer(String),

    /// Scheduler bookkeeping error (registry, timer handles).
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// Visibility channel closed or otherwise unusable.
    #[error("channel error: {0}")]
    Channel(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, PollError>;
