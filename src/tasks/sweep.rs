//! Periodic task sweep.
//!
//! The sweeper is a plain tokio task ticking on a fixed interval. It holds
//! only a [`Weak`] reference to the registry and exits on the first tick
//! after the registry is dropped, so nothing needs to shut it down
//! explicitly.
//!
//! The sweep does not chase exact expiry instants: a task becomes eligible
//! at `finished_at + completed_retention` and is removed on the first tick
//! at or after that point.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use super::TaskRegistry;

/// Retention policy for the task registry.
///
/// ```rust
/// # use tollgate::TaskConfig;
/// # use std::time::Duration;
/// let config = TaskConfig::new()
///     .completed_retention(Duration::from_secs(300))
///     .sweep_interval(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct TaskConfig {
    /// How long a finished task stays pollable. Default: 600 seconds.
    pub completed_retention: Duration,
    /// Absolute age ceiling for any task, finished or not. Default: 900 seconds.
    pub max_age: Duration,
    /// Time between sweeps. Default: 600 seconds.
    pub sweep_interval: Duration,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            completed_retention: Duration::from_secs(600),
            max_age: Duration::from_secs(900),
            sweep_interval: Duration::from_secs(600),
        }
    }
}

impl TaskConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how long finished tasks are kept.
    pub fn completed_retention(mut self, retention: Duration) -> Self {
        self.completed_retention = retention;
        self
    }

    /// Set the absolute age ceiling.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Set the interval between sweeps.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Finished tasks removed after their retention elapsed.
    pub retired: usize,
    /// Tasks removed for exceeding `max_age`.
    pub expired: usize,
}

impl SweepReport {
    /// Total tasks removed.
    pub fn total(&self) -> usize {
        self.retired + self.expired
    }
}

/// Spawn the periodic sweep for `registry`.
///
/// # Panics
///
/// Requires a tokio runtime context.
pub fn spawn_sweeper(registry: &Arc<TaskRegistry>) -> JoinHandle<()> {
    spawn_sweeper_with(registry, || {})
}

/// Spawn the periodic sweep, running `also` after every pass.
///
/// The gateway uses the hook to prune idle rate-limit windows on the same
/// schedule.
pub fn spawn_sweeper_with<F>(registry: &Arc<TaskRegistry>, also: F) -> JoinHandle<()>
where
    F: Fn() + Send + 'static,
{
    let period = registry.config().sweep_interval;
    let weak: Weak<TaskRegistry> = Arc::downgrade(registry);

    tokio::spawn(async move {
        let Some(first) = Instant::now().checked_add(period) else {
            warn!(?period, "sweep interval out of range, sweeper not started");
            return;
        };
        let mut ticker = tokio::time::interval_at(first, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(registry) = weak.upgrade() else {
                break; // registry dropped
            };
            let report = registry.sweep();
            drop(registry);
            also();

            if report.total() > 0 {
                info!(
                    retired = report.retired,
                    expired = report.expired,
                    "task sweep removed entries"
                );
            }
        }
    })
}
