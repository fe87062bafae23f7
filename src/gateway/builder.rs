//! Builder for configuring gateway instances

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::Gateway;
use super::latency::LatencyModel;
use crate::cache::{CacheConfig, ResponseCache};
use crate::limiter::{RateLimitConfig, RateLimiter};
use crate::providers::{
    Backend, BackendChoice, ChatCompletionClient, ChatCompletionConfig, MockBackend,
};
use crate::tasks::{TaskConfig, TaskRegistry};
use crate::{GatewayError, Result};

/// Longest duration any setting may take (about a century).
///
/// Every timestamp comparison stays on the clock below this bound.
const MAX_DURATION: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Main entry point for creating gateway instances.
pub struct Tollgate;

impl Tollgate {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }
}

/// Builder for configuring gateway instances.
///
/// Every setting has a default, so `Tollgate::builder().build()` yields a
/// working gateway with the mock backend, a 1,000-entry cache, five calls
/// per minute per identity, and the standard task retention.
pub struct GatewayBuilder {
    cache: CacheConfig,
    rate_limit: RateLimitConfig,
    rate_limit_enabled: bool,
    tasks: TaskConfig,
    latency: LatencyModel,
    chat_completion: Option<ChatCompletionConfig>,
    backends: HashMap<BackendChoice, Arc<dyn Backend>>,
}

impl GatewayBuilder {
    pub fn new() -> Self {
        Self {
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            rate_limit_enabled: true,
            tasks: TaskConfig::default(),
            latency: LatencyModel::default(),
            chat_completion: None,
            backends: HashMap::new(),
        }
    }

    /// Configure the response cache.
    pub fn response_cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    /// Configure the per-identity rate limit (enables limiting).
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self.rate_limit_enabled = true;
        self
    }

    /// Let every query through regardless of identity.
    pub fn disable_rate_limit(mut self) -> Self {
        self.rate_limit_enabled = false;
        self
    }

    /// Configure task retention and the sweep interval.
    pub fn tasks(mut self, config: TaskConfig) -> Self {
        self.tasks = config;
        self
    }

    /// Configure the simulated processing latency.
    pub fn latency(mut self, latency: LatencyModel) -> Self {
        self.latency = latency;
        self
    }

    /// Configure the chat-completion backend.
    pub fn chat_completion(mut self, config: ChatCompletionConfig) -> Self {
        self.chat_completion = Some(config);
        self
    }

    /// Install a custom backend for `choice`.
    ///
    /// Takes precedence over the built-in backend for that choice.
    pub fn backend(mut self, choice: BackendChoice, backend: Arc<dyn Backend>) -> Self {
        self.backends.insert(choice, backend);
        self
    }

    /// Build the gateway.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Configuration`] for a zero-capacity cache, a zero
    /// sweep interval or rate-limit window, a duration longer than a
    /// century, an inverted latency clamp, or an HTTP client that cannot be
    /// constructed.
    pub fn build(self) -> Result<Gateway> {
        if self.cache.max_entries == 0 {
            return Err(GatewayError::Configuration(
                "cache max_entries must be at least 1".to_string(),
            ));
        }
        if self.tasks.sweep_interval.is_zero() {
            return Err(GatewayError::Configuration(
                "task sweep_interval must be non-zero".to_string(),
            ));
        }
        if self.rate_limit_enabled && self.rate_limit.window.is_zero() {
            return Err(GatewayError::Configuration(
                "rate limit window must be non-zero".to_string(),
            ));
        }
        check_range("cache ttl", self.cache.ttl)?;
        check_range("rate limit window", self.rate_limit.window)?;
        check_range("task completed_retention", self.tasks.completed_retention)?;
        check_range("task max_age", self.tasks.max_age)?;
        check_range("task sweep_interval", self.tasks.sweep_interval)?;
        check_range("latency unit", self.latency.unit)?;
        if self.latency.min_units > self.latency.max_units {
            return Err(GatewayError::Configuration(format!(
                "latency clamp is inverted: min {} > max {}",
                self.latency.min_units, self.latency.max_units
            )));
        }

        let mut backends = self.backends;
        backends
            .entry(BackendChoice::Mock)
            .or_insert_with(|| Arc::new(MockBackend::new()) as Arc<dyn Backend>);
        if let Some(config) = self.chat_completion
            && !backends.contains_key(&BackendChoice::ChatCompletion)
        {
            let client = ChatCompletionClient::new(config)?;
            backends.insert(BackendChoice::ChatCompletion, Arc::new(client));
        }

        Ok(Gateway::new(
            ResponseCache::new(&self.cache),
            RateLimiter::new(self.rate_limit),
            self.rate_limit_enabled,
            TaskRegistry::new(self.tasks),
            backends,
            self.latency,
        ))
    }
}

fn check_range(name: &str, value: Duration) -> Result<()> {
    if value > MAX_DURATION {
        return Err(GatewayError::Configuration(format!(
            "{name} of {value:?} is out of range (max {MAX_DURATION:?})"
        )));
    }
    Ok(())
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}
