//! Tollgate error types

use std::time::Duration;

use crate::tasks::TaskId;

/// Failure talking to a text-generation backend.
///
/// Recorded verbatim as the error detail of a failed deferred task, so the
/// `Display` output is what a poller eventually sees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    /// Transport failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The backend answered 2xx but the body was not a usable completion.
    #[error("malformed backend response: {0}")]
    Malformed(String),
}

/// Tollgate error types
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    // Caller errors
    #[error("rate limit exceeded for {identity}, retry after {retry_after:?}")]
    RateLimitExceeded {
        identity: String,
        retry_after: Option<Duration>,
    },

    #[error("task not found: {0}")]
    NotFound(TaskId),

    // Backend errors
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GatewayError {
    /// Whether resubmitting the same request later could succeed.
    ///
    /// Nothing in the gateway retries on its own; this is advice for callers.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::RateLimitExceeded { .. } => true,
            GatewayError::Upstream(UpstreamError::Http(_)) => true,
            GatewayError::Upstream(UpstreamError::Status { status, .. }) => {
                *status == 429 || *status >= 500
            }
            _ => false,
        }
    }
}

/// Result type alias for Tollgate operations
pub type Result<T> = std::result::Result<T, GatewayError>;
