//! Section-scoped poller orchestration.
//!
//! Dashboards show one section at a time (stock, finance, ...) and only the
//! visible section's pollers should run; "card" style pollers registered
//! directly on the scheduler are unaffected. [`SectionPollers`] stores each
//! section's task specs and swaps the active set on section change.

use crate::scheduler::poller::PollingScheduler;
use crate::scheduler::task::Producer;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

/// Everything needed to (re)register one section task.
#[derive(Clone)]
pub struct TaskSpec {
    /// Unique task name handed to the scheduler.
    pub name: String,
    /// Producer invoked on each tick.
    pub producer: Producer,
    /// Requested polling period.
    pub interval: Duration,
}

impl TaskSpec {
    /// Create a spec for a section task.
    pub fn new(name: impl Into<String>, producer: Producer, interval: Duration) -> Self {
        Self {
            name: name.into(),
            producer,
            interval,
        }
    }
}

impl std::fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSpec")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

struct SectionState {
    sections: HashMap<String, Vec<TaskSpec>>,
    active: Option<String>,
}

/// Switches which section's pollers run as the visible section changes.
pub struct SectionPollers {
    scheduler: Arc<PollingScheduler>,
    state: Mutex<SectionState>,
}

impl SectionPollers {
    /// Create an orchestrator bound to a scheduler.
    pub fn new(scheduler: Arc<PollingScheduler>) -> Self {
        Self {
            scheduler,
            state: Mutex::new(SectionState {
                sections: HashMap::new(),
                active: None,
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SectionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Declare the tasks belonging to a section, replacing any previous
    /// declaration for that section name.
    pub fn set_section(&self, section: impl Into<String>, tasks: Vec<TaskSpec>) {
        let section = section.into();
        debug!(section = %section, tasks = tasks.len(), "section tasks declared");
        self.lock_state().sections.insert(section, tasks);
    }

    /// Name of the currently active section, if any.
    pub fn active(&self) -> Option<String> {
        self.lock_state().active.clone()
    }

    /// Make `section` the visible one.
    ///
    /// Unregisters every other section's tasks and registers the named
    /// section's tasks. A section with no declared tasks (or an unknown
    /// name) just deactivates everything else. Activating the already
    /// active section re-registers its tasks, which the scheduler treats
    /// as a no-op for tasks still active.
    pub fn activate(&self, section: &str) {
        let mut state = self.lock_state();
        for (name, tasks) in &state.sections {
            if name != section {
                for spec in tasks {
                    self.scheduler.unregister(&spec.name);
                }
            }
        }
        if let Some(tasks) = state.sections.get(section) {
            for spec in tasks {
                self.scheduler.register_with_interval(
                    &spec.name,
                    Arc::clone(&spec.producer),
                    spec.interval,
                );
            }
        }
        state.active = Some(section.to_owned());
        info!(section, "section activated");
    }

    /// Deactivate every section's tasks (e.g. leaving the dashboard).
    pub fn deactivate_all(&self) {
        let mut state = self.lock_state();
        for tasks in state.sections.values() {
            for spec in tasks {
                self.scheduler.unregister(&spec.name);
            }
        }
        state.active = None;
        info!("all sections deactivated");
    }
}
