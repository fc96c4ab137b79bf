//! Polling scheduler core.
//!
//! Owns a registry of named recurring tasks. Each active task holds one
//! spawned timer loop that fires invocations of its producer; an atomic
//! in-progress flag guarantees at most one invocation per task is in flight.
//! Page visibility transitions suspend and resume every active task's timer
//! without touching in-flight work.

use crate::config::SchedulerConfig;
use crate::scheduler::task::{
    Producer, ProducerOutput, TaskFlags, TaskSnapshot, fallback_delay,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Page/tab visibility as reported by the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Page is visible; polling runs on schedule.
    Visible,
    /// Page is hidden; periodic triggers are cancelled.
    Hidden,
}

/// Public snapshot used by doctor/diagnostic tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerSnapshot {
    /// All known tasks, sorted by name. Inactive tasks are retained for the
    /// process lifetime and appear here too.
    pub tasks: Vec<TaskSnapshot>,
}

/// One registry slot. The flags are shared with spawned invocations; the
/// timer handle is the cancellable periodic trigger.
struct TaskEntry {
    flags: Arc<TaskFlags>,
    producer: Producer,
    interval: Duration,
    timer: Option<JoinHandle<()>>,
}

/// Overlap-safe polling scheduler.
///
/// Constructed once by the application shell and shared (`Arc`) with any
/// code that needs to register or unregister pollers. All registry mutation
/// happens in short synchronous sections; producers run on their own spawned
/// tasks.
pub struct PollingScheduler {
    config: SchedulerConfig,
    tasks: Mutex<HashMap<String, TaskEntry>>,
}

impl Default for PollingScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PollingScheduler {
    /// Create a scheduler with default configuration.
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Create a scheduler with the given configuration.
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            config,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_tasks(&self) -> MutexGuard<'_, HashMap<String, TaskEntry>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn default_interval(&self) -> Duration {
        Duration::from_millis(self.config.default_interval_ms)
    }

    fn min_fallback(&self) -> Duration {
        Duration::from_millis(self.config.min_fallback_ms)
    }

    /// Register a recurring task at the default interval.
    ///
    /// See [`register_with_interval`](Self::register_with_interval).
    pub fn register(&self, name: &str, producer: Producer) {
        self.register_with_interval(name, producer, self.default_interval());
    }

    /// Register a recurring task.
    ///
    /// Performs one immediate invocation, then fires the producer every
    /// `interval`. Registering a name that is already active is a silent
    /// no-op: rapid repeated UI triggers must not stack timers. Registering
    /// an inactive name reactivates it with the new producer and interval.
    pub fn register_with_interval(&self, name: &str, producer: Producer, interval: Duration) {
        if name.is_empty() {
            warn!("ignoring poll registration with empty task name");
            return;
        }
        let interval = if interval.is_zero() {
            warn!(task = name, "zero interval requested, using default");
            self.default_interval()
        } else {
            interval
        };

        let mut tasks = self.lock_tasks();
        let entry = match tasks.entry(name.to_owned()) {
            Entry::Occupied(occupied) => {
                let entry = occupied.into_mut();
                if entry.flags.is_active() {
                    debug!(task = name, "already active, keeping existing schedule");
                    return;
                }
                if let Some(stale) = entry.timer.take() {
                    stale.abort();
                }
                // Reactivation installs the newly supplied producer and
                // period, and fresh flags: an invocation still in flight
                // from the previous activation holds the old flags, and its
                // settlement must not release the new activation's
                // in-progress guard.
                entry.producer = producer;
                entry.interval = interval;
                entry.flags = Arc::new(TaskFlags::default());
                entry
            }
            Entry::Vacant(vacant) => vacant.insert(TaskEntry {
                flags: Arc::new(TaskFlags::default()),
                producer,
                interval,
                timer: None,
            }),
        };
        entry.flags.set_active(true);

        let fallback = fallback_delay(interval, self.min_fallback());
        Self::spawn_invocation(
            name.to_owned(),
            Arc::clone(&entry.flags),
            Arc::clone(&entry.producer),
            fallback,
        );
        entry.timer = Some(Self::spawn_timer(
            name.to_owned(),
            Arc::clone(&entry.flags),
            Arc::clone(&entry.producer),
            interval,
            fallback,
        ));

        info!(
            task = name,
            interval_ms = interval.as_millis() as u64,
            "poll task registered"
        );
    }

    /// Deactivate a task and cancel its periodic trigger.
    ///
    /// The in-progress flag is cleared unconditionally so the task is
    /// immediately re-activatable; an invocation already in flight settles
    /// naturally with its result discarded. Unknown names are ignored.
    pub fn unregister(&self, name: &str) {
        let mut tasks = self.lock_tasks();
        let Some(entry) = tasks.get_mut(name) else {
            debug!(task = name, "unregister for unknown task ignored");
            return;
        };
        entry.flags.set_active(false);
        if let Some(timer) = entry.timer.take() {
            timer.abort();
        }
        entry.flags.end_run();
        info!(task = name, "poll task unregistered");
    }

    /// Cancel every active task's periodic trigger (page went hidden).
    ///
    /// Leaves `active` and in-progress state untouched: in-flight
    /// invocations settle naturally, no new ones start.
    pub fn suspend(&self) {
        let mut tasks = self.lock_tasks();
        let mut stopped = 0usize;
        for entry in tasks.values_mut() {
            if entry.flags.is_active()
                && let Some(timer) = entry.timer.take()
            {
                timer.abort();
                stopped += 1;
            }
        }
        info!(stopped, "polling suspended while page hidden");
    }

    /// Reschedule every active task that lost its trigger (page visible).
    ///
    /// Resumes at each task's originally requested interval. The legacy
    /// dashboard resumed everything at the flat default interval instead;
    /// `SchedulerConfig::legacy_resume_interval` restores that behaviour.
    /// No immediate invocation fires on resume; the first tick lands one
    /// period later.
    pub fn resume(&self) {
        let default_interval = self.default_interval();
        let min_fallback = self.min_fallback();
        let mut tasks = self.lock_tasks();
        let mut resumed = 0usize;
        for (name, entry) in tasks.iter_mut() {
            if !entry.flags.is_active() || entry.timer.is_some() {
                continue;
            }
            let period = if self.config.legacy_resume_interval {
                default_interval
            } else {
                entry.interval
            };
            entry.timer = Some(Self::spawn_timer(
                name.clone(),
                Arc::clone(&entry.flags),
                Arc::clone(&entry.producer),
                period,
                fallback_delay(entry.interval, min_fallback),
            ));
            resumed += 1;
        }
        info!(resumed, "polling resumed");
    }

    /// Spawn a watcher that suspends/resumes this scheduler on visibility
    /// transitions.
    ///
    /// The watcher stops when the sender side of the channel is dropped.
    pub fn watch_visibility(
        self: &Arc<Self>,
        mut rx: watch::Receiver<Visibility>,
    ) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let visibility = *rx.borrow();
                match visibility {
                    Visibility::Hidden => scheduler.suspend(),
                    Visibility::Visible => scheduler.resume(),
                }
            }
            debug!("visibility channel closed, watcher stopping");
        })
    }

    /// Point-in-time view of the registry, sorted by task name.
    pub fn snapshot(&self) -> SchedulerSnapshot {
        let tasks = self.lock_tasks();
        let mut out: Vec<TaskSnapshot> = tasks
            .iter()
            .map(|(name, entry)| TaskSnapshot {
                name: name.clone(),
                active: entry.flags.is_active(),
                in_progress: entry.flags.is_in_progress(),
                scheduled: entry.timer.is_some(),
                interval_ms: entry.interval.as_millis() as u64,
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        SchedulerSnapshot { tasks: out }
    }

    /// Fire one invocation unless the task is inactive or still in flight.
    ///
    /// Runs the producer on its own spawned task so that cancelling the
    /// periodic trigger never cancels in-flight work.
    fn spawn_invocation(name: String, flags: Arc<TaskFlags>, producer: Producer, fallback: Duration) {
        if !flags.is_active() {
            return;
        }
        if !flags.try_begin() {
            debug!(task = %name, "previous invocation still in flight, skipping");
            return;
        }
        tokio::spawn(async move {
            match producer() {
                ProducerOutput::Pending(fut) => {
                    match fut.await {
                        Ok(()) => debug!(task = %name, "invocation completed"),
                        Err(e) => warn!(task = %name, error = %e, "invocation failed"),
                    }
                    flags.end_run();
                }
                ProducerOutput::Immediate => {
                    // No future to observe: release after the bounded
                    // fallback delay so a misbehaving producer cannot block
                    // the task forever.
                    debug!(task = %name, "synchronous producer, holding fallback delay");
                    tokio::time::sleep(fallback).await;
                    flags.end_run();
                }
            }
        });
    }

    /// Periodic trigger loop for one task.
    ///
    /// The first (immediate) interval tick is consumed because registration
    /// already fired the immediate invocation.
    fn spawn_timer(
        name: String,
        flags: Arc<TaskFlags>,
        producer: Producer,
        period: Duration,
        fallback: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !flags.is_active() {
                    break;
                }
                Self::spawn_invocation(
                    name.clone(),
                    Arc::clone(&flags),
                    Arc::clone(&producer),
                    fallback,
                );
            }
        })
    }
}
