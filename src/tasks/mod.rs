//! Deferred task tracking.
//!
//! A deferred query is represented by a [`Task`] in the [`TaskRegistry`].
//! The gateway creates the task, a background job performs the work and
//! moves the task to a terminal state exactly once, and pollers read
//! snapshots until the periodic sweep retires the entry.
//!
//! ```text
//!   create()          complete()/fail()        sweep()
//!      │                     │                    │
//!      ▼                     ▼                    ▼
//!  Processing ──────► Completed | Failed ─────► (absent)
//!      │                                          ▲
//!      └──────────── older than max_age ──────────┘
//! ```
//!
//! "Absent" is not a status: polling an identifier the registry no longer
//! holds yields [`GatewayError::NotFound`](crate::GatewayError::NotFound),
//! whether the task was swept or never existed.

pub mod registry;
pub mod sweep;

pub use registry::TaskRegistry;
pub use sweep::{SweepReport, TaskConfig, spawn_sweeper, spawn_sweeper_with};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

/// Opaque poll token for a deferred query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Lifecycle state of a task.
///
/// Serialized with an inline `status` tag so a task renders as
/// `{"status": "completed", "result": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskStatus {
    Processing,
    Completed { result: String },
    Failed { error: String },
}

impl TaskStatus {
    /// Whether the task has finished (either way).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Processing)
    }

    /// Status name as used in logs, metrics and the wire format.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Processing => "processing",
            TaskStatus::Completed { .. } => "completed",
            TaskStatus::Failed { .. } => "failed",
        }
    }
}

/// Snapshot of a registered task.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    #[serde(rename = "task_id")]
    pub id: TaskId,
    #[serde(flatten)]
    pub status: TaskStatus,
    #[serde(skip)]
    pub created_at: Instant,
    /// Set when the task reaches a terminal state.
    #[serde(skip)]
    pub finished_at: Option<Instant>,
}

impl Task {
    /// The answer, if the task completed.
    pub fn result(&self) -> Option<&str> {
        match &self.status {
            TaskStatus::Completed { result } => Some(result),
            _ => None,
        }
    }

    /// The error detail, if the task failed.
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            TaskStatus::Failed { error } => Some(error),
            _ => None,
        }
    }
}
