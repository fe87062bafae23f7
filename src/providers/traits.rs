//! Backend trait for text-generation providers.
//!
//! A backend receives the already-truncated prompt and returns the answer
//! text. Backends are stateless from the gateway's point of view: each call
//! is independent and no backend retries on its own. Callers that want
//! resilience resubmit.
//!
//! # Example
//!
//! ```ignore
//! struct Upper;
//!
//! #[async_trait]
//! impl Backend for Upper {
//!     fn name(&self) -> &str {
//!         "upper"
//!     }
//!
//!     async fn invoke(&self, prompt: &str) -> Result<String, UpstreamError> {
//!         Ok(prompt.to_uppercase())
//!     }
//! }
//! ```

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::UpstreamError;

/// A text-generation backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend name for logging/metrics.
    fn name(&self) -> &str;

    /// Generate an answer for `prompt`.
    async fn invoke(&self, prompt: &str) -> Result<String, UpstreamError>;
}

/// Which backend a query should be sent to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendChoice {
    /// Echo-style mock, always available.
    #[default]
    Mock,
    /// OpenAI-style chat-completion endpoint.
    ChatCompletion,
}

impl BackendChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendChoice::Mock => "mock",
            BackendChoice::ChatCompletion => "chat_completion",
        }
    }
}

impl fmt::Display for BackendChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
