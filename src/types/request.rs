//! Query request type

use serde::{Deserialize, Serialize};

use super::identity::Identity;
use crate::providers::BackendChoice;

/// Default number of prompt characters kept.
pub const DEFAULT_CONTEXT_SIZE: usize = 200;

/// A prompt submitted to the gateway.
///
/// Deserializes with the same defaults the builder methods start from:
/// caching on, synchronous, 200 characters of context, mock backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub prompt: String,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
    #[serde(default)]
    pub use_async: bool,
    #[serde(default = "default_context_size")]
    pub context_size: usize,
    #[serde(default)]
    pub backend: BackendChoice,
    pub identity: Identity,
}

fn default_use_cache() -> bool {
    true
}

fn default_context_size() -> usize {
    DEFAULT_CONTEXT_SIZE
}

impl QueryRequest {
    pub fn new(prompt: impl Into<String>, identity: Identity) -> Self {
        Self {
            prompt: prompt.into(),
            use_cache: true,
            use_async: false,
            context_size: DEFAULT_CONTEXT_SIZE,
            backend: BackendChoice::default(),
            identity,
        }
    }

    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn use_async(mut self, use_async: bool) -> Self {
        self.use_async = use_async;
        self
    }

    pub fn context_size(mut self, chars: usize) -> Self {
        self.context_size = chars;
        self
    }

    pub fn backend(mut self, backend: BackendChoice) -> Self {
        self.backend = backend;
        self
    }

    /// The prompt cut to `context_size` characters.
    ///
    /// This is both the cache key and what the backend receives.
    pub fn truncated_prompt(&self) -> &str {
        truncate_chars(&self.prompt, self.context_size)
    }
}

/// First `max` characters of `s` (Unicode scalar values, not bytes).
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_shorter_than_limit() {
        assert_eq!(truncate_chars("hello", 200), "hello");
    }

    #[test]
    fn truncate_exact_limit() {
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("hello", 4), "hell");
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
    }

    #[test]
    fn truncate_to_zero() {
        assert_eq!(truncate_chars("hello", 0), "");
    }

    #[test]
    fn deserialize_applies_defaults() {
        let request: QueryRequest = serde_json::from_value(serde_json::json!({
            "prompt": "hello",
            "identity": {"user": "alice"}
        }))
        .unwrap();

        assert!(request.use_cache);
        assert!(!request.use_async);
        assert_eq!(request.context_size, 200);
        assert_eq!(request.backend, BackendChoice::Mock);
        assert_eq!(request.identity, Identity::user("alice"));
    }

    #[test]
    fn deserialize_address_identity_and_backend() {
        let request: QueryRequest = serde_json::from_value(serde_json::json!({
            "prompt": "hello",
            "use_async": true,
            "backend": "chat_completion",
            "identity": {"address": "10.0.0.1"}
        }))
        .unwrap();

        assert!(request.use_async);
        assert_eq!(request.backend, BackendChoice::ChatCompletion);
        assert_eq!(request.identity.key(), "addr:10.0.0.1");
    }
}
