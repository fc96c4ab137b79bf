//! Pollguard: overlap-safe polling with visibility-aware suspend/resume.
//!
//! Dashboards refresh their data by polling backend endpoints. Naive
//! `setInterval`-style polling stacks requests when a fetch outlives its
//! period and keeps burning bandwidth while nobody is looking. This crate
//! provides the scheduling layer that fixes both:
//!
//! - [`PollingScheduler`]: named recurring tasks, one immediate invocation
//!   on registration, at most one in-flight invocation per task (overlapping
//!   ticks are skipped, never queued), silent recovery from producer
//!   failures.
//! - [`Visibility`] reactions: on `Hidden` every active task's periodic
//!   trigger is cancelled (in-flight work settles naturally); on `Visible`
//!   they are rescheduled without the caller re-registering anything.
//! - [`SectionPollers`]: swaps which section's pollers run as the user moves
//!   between dashboard sections.
//!
//! Producers are zero-argument callables returning either a future
//! ([`ProducerOutput::Pending`]) or a plain synchronous completion
//! ([`ProducerOutput::Immediate`]); the latter is released after a bounded
//! fallback delay so a producer that never reports back cannot wedge its
//! task.

pub mod config;
pub mod error;
pub mod scheduler;

pub use config::SchedulerConfig;
pub use error::{PollError, Result};
pub use scheduler::{
    PollingScheduler, Producer, ProducerOutput, SchedulerSnapshot, SectionPollers, TaskSnapshot,
    TaskSpec, Visibility, async_producer, sync_producer,
};
