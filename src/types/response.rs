//! Query response type

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::tasks::TaskId;

/// What the gateway hands back for a submitted query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResponse {
    /// Synchronous answer.
    Answer { answer: String, cached: bool },
    /// Deferred; poll with the task id.
    Deferred { task_id: TaskId },
}

impl QueryResponse {
    /// The answer text, for synchronous responses.
    pub fn answer(&self) -> Option<&str> {
        match self {
            QueryResponse::Answer { answer, .. } => Some(answer),
            QueryResponse::Deferred { .. } => None,
        }
    }

    /// Whether a synchronous answer came from the cache.
    pub fn is_cached(&self) -> bool {
        matches!(self, QueryResponse::Answer { cached: true, .. })
    }

    /// The poll token, for deferred responses.
    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            QueryResponse::Deferred { task_id } => Some(*task_id),
            QueryResponse::Answer { .. } => None,
        }
    }
}

/// Renders `{"response", "cached"}` for answers and
/// `{"status": "processing", "task_id"}` for deferred queries.
impl Serialize for QueryResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            QueryResponse::Answer { answer, cached } => {
                let mut s = serializer.serialize_struct("QueryResponse", 2)?;
                s.serialize_field("response", answer)?;
                s.serialize_field("cached", cached)?;
                s.end()
            }
            QueryResponse::Deferred { task_id } => {
                let mut s = serializer.serialize_struct("QueryResponse", 2)?;
                s.serialize_field("status", "processing")?;
                s.serialize_field("task_id", task_id)?;
                s.end()
            }
        }
    }
}
