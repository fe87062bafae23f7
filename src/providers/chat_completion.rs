//! OpenAI-style chat-completion client.
//!
//! Sends the prompt as a single user message to `{base_url}/chat/completions`
//! and returns the content of the first choice. Works against OpenAI and
//! any server that speaks the same request/response shape.
//! See: <https://platform.openai.com/docs/api-reference/chat>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::traits::Backend;
use crate::{GatewayError, Result, UpstreamError};

/// Default base URL for the OpenAI API
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model sent with every request
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Configuration for [`ChatCompletionClient`].
#[derive(Debug, Clone)]
pub struct ChatCompletionConfig {
    /// Endpoint root, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Bearer token. Omitted from requests when `None`.
    pub api_key: Option<String>,
    /// Per-request timeout. Default: 60 seconds.
    pub timeout: Duration,
}

impl Default for ChatCompletionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(60),
        }
    }
}

impl ChatCompletionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client for an OpenAI-compatible chat-completion endpoint.
#[derive(Clone)]
pub struct ChatCompletionClient {
    http: Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl ChatCompletionClient {
    /// Create a client from configuration.
    pub fn new(config: ChatCompletionConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                GatewayError::Configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            url: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model,
            api_key: config.api_key,
        })
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::new(ChatCompletionConfig::new().base_url(base_url))
    }

    /// Model identifier sent with each request.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Request a completion for `prompt`.
    #[instrument(name = "chat_completion", skip(self, prompt), fields(model = %self.model))]
    pub async fn complete(&self, prompt: &str) -> std::result::Result<String, UpstreamError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut request = self.http.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpstreamError::Http(e.to_string()))?;

        let response = check_status(response).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::Http(e.to_string()))?;
        let parsed: ChatResponse = serde_json::from_slice(&bytes)
            .map_err(|e| UpstreamError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| UpstreamError::Malformed("response has no choice content".to_string()))
    }
}

/// Map a non-success status to [`UpstreamError::Status`], keeping the body
/// as the message when there is one.
async fn check_status(
    response: reqwest::Response,
) -> std::result::Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string()
    } else {
        body
    };
    Err(UpstreamError::Status {
        status: status.as_u16(),
        message,
    })
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ============================================================================
// Backend Trait Implementation
// ============================================================================

#[async_trait]
impl Backend for ChatCompletionClient {
    fn name(&self) -> &str {
        "chat_completion"
    }

    async fn invoke(&self, prompt: &str) -> std::result::Result<String, UpstreamError> {
        self.complete(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_strips_trailing_slash() {
        let client = ChatCompletionClient::with_base_url("http://localhost:8080/v1/").unwrap();
        assert_eq!(client.url, "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn default_config() {
        let config = ChatCompletionConfig::default();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert!(config.api_key.is_none());
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn request_shape() {
        let body = ChatRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "m",
                "messages": [{"role": "user", "content": "hi"}]
            })
        );
    }
}
