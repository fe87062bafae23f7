//! In-memory registry of deferred tasks.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::debug;

use super::sweep::{SweepReport, TaskConfig};
use super::{Task, TaskId, TaskStatus};
use crate::telemetry;

/// Thread-safe store of [`Task`]s keyed on [`TaskId`].
///
/// Every operation takes the lock for one map access and releases it before
/// returning; snapshots handed out by [`get`](Self::get) are clones, so a
/// poller never blocks a background job.
pub struct TaskRegistry {
    tasks: RwLock<HashMap<TaskId, Task>>,
    config: TaskConfig,
}

impl TaskRegistry {
    pub fn new(config: TaskConfig) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Retention and sweep settings.
    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    /// Register a new task in the `processing` state.
    pub fn create(&self) -> TaskId {
        let id = TaskId::new();
        let task = Task {
            id,
            status: TaskStatus::Processing,
            created_at: Instant::now(),
            finished_at: None,
        };
        self.tasks.write().insert(id, task);
        metrics::counter!(telemetry::TASKS_CREATED_TOTAL).increment(1);
        debug!(task_id = %id, "task registered");
        id
    }

    /// Move a processing task to `completed`.
    ///
    /// Returns `false` without changing anything if the task is unknown
    /// (never created, or already swept) or already terminal.
    pub fn complete(&self, id: &TaskId, result: impl Into<String>) -> bool {
        self.finish(
            id,
            TaskStatus::Completed {
                result: result.into(),
            },
        )
    }

    /// Move a processing task to `failed`.
    ///
    /// Same no-op rules as [`complete`](Self::complete).
    pub fn fail(&self, id: &TaskId, error: impl Into<String>) -> bool {
        self.finish(
            id,
            TaskStatus::Failed {
                error: error.into(),
            },
        )
    }

    fn finish(&self, id: &TaskId, status: TaskStatus) -> bool {
        let label = status.as_str();
        let now = Instant::now();

        let applied = {
            let mut tasks = self.tasks.write();
            match tasks.get_mut(id) {
                Some(task) if !task.status.is_terminal() => {
                    task.status = status;
                    task.finished_at = Some(now);
                    true
                }
                _ => false,
            }
        };

        if applied {
            metrics::counter!(telemetry::TASKS_FINISHED_TOTAL, "status" => label).increment(1);
            debug!(task_id = %id, status = label, "task finished");
        } else {
            debug!(task_id = %id, status = label, "ignored transition on absent or terminal task");
        }
        applied
    }

    /// Snapshot of a task, or `None` if unknown or swept.
    pub fn get(&self, id: &TaskId) -> Option<Task> {
        self.tasks.read().get(id).cloned()
    }

    /// Number of tasks currently held.
    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    /// Whether the registry holds no tasks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove tasks past their retention.
    ///
    /// A task is removed when it is older than `max_age` (whatever its
    /// status), or when it finished at least `completed_retention` ago.
    pub fn sweep(&self) -> SweepReport {
        let now = Instant::now();
        let mut report = SweepReport::default();

        self.tasks.write().retain(|_, task| {
            if now.saturating_duration_since(task.created_at) >= self.config.max_age {
                report.expired += 1;
                return false;
            }
            match task.finished_at {
                Some(finished)
                    if now.saturating_duration_since(finished)
                        >= self.config.completed_retention =>
                {
                    report.retired += 1;
                    false
                }
                _ => true,
            }
        });

        if report.retired > 0 {
            metrics::counter!(telemetry::TASKS_SWEPT_TOTAL, "reason" => "retention")
                .increment(report.retired as u64);
        }
        if report.expired > 0 {
            metrics::counter!(telemetry::TASKS_SWEPT_TOTAL, "reason" => "max_age")
                .increment(report.expired as u64);
        }
        report
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new(TaskConfig::default())
    }
}
