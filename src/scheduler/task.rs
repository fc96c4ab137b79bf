//! Poll task definitions and producer types.
//!
//! Defines the [`Producer`] callable a task invokes on each tick, the
//! [`ProducerOutput`] it hands back, and the shared per-task flags the
//! scheduler uses to serialize invocations.

use crate::error::Result;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// What a single producer invocation handed back.
pub enum ProducerOutput {
    /// Asynchronous work still pending; the task stays in-progress until the
    /// future settles.
    Pending(BoxFuture<'static, Result<()>>),
    /// Synchronous work that already completed (or a plain value); the task
    /// stays in-progress for a bounded fallback delay instead.
    Immediate,
}

impl std::fmt::Debug for ProducerOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending(_) => f.write_str("ProducerOutput::Pending"),
            Self::Immediate => f.write_str("ProducerOutput::Immediate"),
        }
    }
}

/// The callable a task invokes on each scheduled tick.
///
/// Shared so that the periodic timer loop and the immediate first invocation
/// can both hold it.
pub type Producer = Arc<dyn Fn() -> ProducerOutput + Send + Sync>;

/// Wrap an async closure as a [`Producer`].
///
/// Each invocation calls `f` and reports the returned future as
/// [`ProducerOutput::Pending`].
pub fn async_producer<F, Fut>(f: F) -> Producer
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move || ProducerOutput::Pending(Box::pin(f())))
}

/// Wrap a synchronous closure as a [`Producer`].
///
/// The closure runs to completion inside the invocation; the scheduler then
/// applies the fallback release delay before allowing the next run.
pub fn sync_producer<F>(f: F) -> Producer
where
    F: Fn() + Send + Sync + 'static,
{
    Arc::new(move || {
        f();
        ProducerOutput::Immediate
    })
}

/// Per-task flags shared between the registry and spawned invocations.
///
/// `active` gates whether ticks may invoke at all; `in_progress` serializes
/// invocations of the same task (a tick that finds it set is skipped, never
/// queued).
#[derive(Debug, Default)]
pub(crate) struct TaskFlags {
    active: AtomicBool,
    in_progress: AtomicBool,
}

impl TaskFlags {
    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    pub(crate) fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Claim the in-progress flag. Returns `false` when a previous
    /// invocation has not settled yet.
    pub(crate) fn try_begin(&self) -> bool {
        self.in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Release the in-progress flag after an invocation settles.
    pub(crate) fn end_run(&self) {
        self.in_progress.store(false, Ordering::SeqCst);
    }
}

/// Release delay applied when a producer completes synchronously.
///
/// Bounds how long a producer that never hands back a future can block the
/// next invocation: half the task's period, floored at `min_fallback`.
pub(crate) fn fallback_delay(interval: Duration, min_fallback: Duration) -> Duration {
    (interval / 2).max(min_fallback)
}

/// Point-in-time view of one registered task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Unique task name (e.g. `"stock"`).
    pub name: String,
    /// Whether the task is registered to run periodically.
    pub active: bool,
    /// Whether an invocation is currently in flight.
    pub in_progress: bool,
    /// Whether a periodic timer is currently scheduled (false while the
    /// scheduler is suspended for a hidden page).
    pub scheduled: bool,
    /// Requested period between invocations, in milliseconds.
    pub interval_ms: u64,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn fallback_is_half_interval_for_long_periods() {
        let d = fallback_delay(Duration::from_millis(60_000), Duration::from_millis(1_000));
        assert_eq!(d, Duration::from_millis(30_000));
    }

    #[test]
    fn fallback_is_floored_for_short_periods() {
        let d = fallback_delay(Duration::from_millis(1_000), Duration::from_millis(1_000));
        assert_eq!(d, Duration::from_millis(1_000));
        let d = fallback_delay(Duration::from_millis(100), Duration::from_millis(1_000));
        assert_eq!(d, Duration::from_millis(1_000));
    }

    #[test]
    fn flags_serialize_invocations() {
        let flags = TaskFlags::default();
        assert!(!flags.is_in_progress());
        assert!(flags.try_begin());
        assert!(flags.is_in_progress());
        assert!(!flags.try_begin(), "second claim must be refused");
        flags.end_run();
        assert!(flags.try_begin(), "flag must be reclaimable after release");
    }

    #[test]
    fn sync_producer_reports_immediate() {
        let producer = sync_producer(|| {});
        assert!(matches!(producer(), ProducerOutput::Immediate));
    }

    #[tokio::test]
    async fn async_producer_reports_pending() {
        let producer = async_producer(|| async { Ok(()) });
        match producer() {
            ProducerOutput::Pending(fut) => assert!(fut.await.is_ok()),
            ProducerOutput::Immediate => panic!("expected Pending"),
        }
    }

    #[test]
    fn snapshot_serde_round_trip() {
        let snap = TaskSnapshot {
            name: "stock".to_owned(),
            active: true,
            in_progress: false,
            scheduled: true,
            interval_ms: 60_000,
        };
        let json = serde_json::to_string(&snap).unwrap();
        let restored: TaskSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.name, "stock");
        assert!(restored.active);
        assert!(restored.scheduled);
        assert_eq!(restored.interval_ms, 60_000);
    }
}
