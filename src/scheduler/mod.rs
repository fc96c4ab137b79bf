//! Overlap-safe polling scheduler.
//!
//! Runs named recurring tasks (dashboard data refreshes) with at most one
//! in-flight invocation per task, and suspends/resumes all active tasks on
//! page visibility transitions.

pub mod poller;
pub mod sections;
pub mod task;

pub use poller::{PollingScheduler, SchedulerSnapshot, Visibility};
pub use sections::{SectionPollers, TaskSpec};
pub use task::{Producer, ProducerOutput, TaskSnapshot, async_producer, sync_producer};
