//! Echo backend for demos and tests.

use async_trait::async_trait;

use super::traits::Backend;
use crate::UpstreamError;

/// Backend that answers by echoing the prompt back.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockBackend;

impl MockBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn invoke(&self, prompt: &str) -> Result<String, UpstreamError> {
        Ok(format!("[MOCK LLM] You said: {prompt}"))
    }
}
