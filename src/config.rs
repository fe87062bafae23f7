//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.tollgate/config.toml` (user)
//! 3. `/etc/tollgate/config.toml` (system)
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.tollgate/secrets.toml` (user, must be 0600)
//! 2. `/etc/tollgate/secrets.toml` (system, must be 0600)
//!
//! Every field has a default, so an empty file is a valid configuration.
//! Durations are whole seconds (milliseconds for the latency unit).

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::gateway::{GatewayBuilder, LatencyModel, Tollgate};
use crate::limiter::RateLimitConfig;
use crate::providers::ChatCompletionConfig;
use crate::tasks::TaskConfig;
use crate::{GatewayError, Result};

/// Environment variable consulted when no secrets file provides a key.
const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

/// Gateway configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub rate_limit: RateLimitSection,
    #[serde(default)]
    pub tasks: TasksSection,
    #[serde(default)]
    pub latency: LatencySection,
    #[serde(default)]
    pub backend: BackendSection,
}

/// Response cache settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    /// Maximum cached answers (default: 1000).
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Entry time-to-live in seconds (default: 3600).
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_max_entries() -> usize {
    1_000
}

fn default_ttl_secs() -> u64 {
    3_600
}

/// Rate limit settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitSection {
    /// Whether queries are rate limited at all (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Calls per window (default: 5).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Window length in seconds (default: 60).
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: default_limit(),
            window_secs: default_window_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_limit() -> usize {
    5
}

fn default_window_secs() -> u64 {
    60
}

/// Task retention settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TasksSection {
    /// How long finished tasks stay pollable, in seconds (default: 600).
    #[serde(default = "default_retention_secs")]
    pub completed_retention_secs: u64,
    /// Age ceiling for any task, in seconds (default: 900).
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
    /// Seconds between sweeps (default: 600).
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for TasksSection {
    fn default() -> Self {
        Self {
            completed_retention_secs: default_retention_secs(),
            max_age_secs: default_max_age_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_retention_secs() -> u64 {
    600
}

fn default_max_age_secs() -> u64 {
    900
}

fn default_sweep_interval_secs() -> u64 {
    600
}

/// Simulated latency settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LatencySection {
    /// Length of one latency unit in milliseconds (default: 1000).
    #[serde(default = "default_unit_ms")]
    pub unit_ms: u64,
    /// Context characters per unit (default: 200).
    #[serde(default = "default_chars_per_unit")]
    pub chars_per_unit: usize,
    /// Lower clamp in units (default: 1).
    #[serde(default = "default_min_units")]
    pub min_units: u32,
    /// Upper clamp in units (default: 5).
    #[serde(default = "default_max_units")]
    pub max_units: u32,
}

impl Default for LatencySection {
    fn default() -> Self {
        Self {
            unit_ms: default_unit_ms(),
            chars_per_unit: default_chars_per_unit(),
            min_units: default_min_units(),
            max_units: default_max_units(),
        }
    }
}

fn default_unit_ms() -> u64 {
    1_000
}

fn default_chars_per_unit() -> usize {
    200
}

fn default_min_units() -> u32 {
    1
}

fn default_max_units() -> u32 {
    5
}

/// Backend configurations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendSection {
    /// Chat-completion endpoint. The backend is only available when present.
    #[serde(default)]
    pub chat_completion: Option<ChatCompletionSection>,
}

/// Chat-completion endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatCompletionSection {
    /// Endpoint root (default: https://api.openai.com/v1).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model sent with every request (default: gpt-3.5-turbo).
    #[serde(default = "default_model")]
    pub model: String,
    /// Request timeout in seconds (default: 60).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    ChatCompletionConfig::default().base_url
}

fn default_model() -> String {
    ChatCompletionConfig::default().model
}

fn default_timeout_secs() -> u64 {
    60
}

/// Secrets configuration (API keys).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub chat_completion: Option<ApiKeySecret>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.tollgate/config.toml`
    /// 3. `/etc/tollgate/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?.ok_or_else(|| {
            GatewayError::Configuration(
                "No config file found. Create ~/.tollgate/config.toml or /etc/tollgate/config.toml"
                    .to_string(),
            )
        })?;
        Self::load_from_file(&path)
    }

    /// Like [`load`](Self::load), but falls back to defaults when no file
    /// exists in the standard locations.
    ///
    /// An explicit path that does not exist is still an error.
    pub fn load_or_default(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| GatewayError::Configuration(format!("Failed to parse config: {e}")))
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GatewayError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            GatewayError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path, `None` if no standard file exists.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(GatewayError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".tollgate").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/tollgate/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Map this configuration onto a gateway builder.
    ///
    /// The chat-completion backend is registered only when its section is
    /// present; its API key comes from `secrets`.
    pub fn builder(&self, secrets: &Secrets) -> GatewayBuilder {
        let mut builder = Tollgate::builder()
            .response_cache(
                CacheConfig::new()
                    .max_entries(self.cache.max_entries)
                    .ttl(Duration::from_secs(self.cache.ttl_secs)),
            )
            .tasks(
                TaskConfig::new()
                    .completed_retention(Duration::from_secs(self.tasks.completed_retention_secs))
                    .max_age(Duration::from_secs(self.tasks.max_age_secs))
                    .sweep_interval(Duration::from_secs(self.tasks.sweep_interval_secs)),
            )
            .latency(
                LatencyModel::new()
                    .unit(Duration::from_millis(self.latency.unit_ms))
                    .chars_per_unit(self.latency.chars_per_unit)
                    .clamp_units(self.latency.min_units, self.latency.max_units),
            );

        builder = if self.rate_limit.enabled {
            builder.rate_limit(
                RateLimitConfig::new()
                    .limit(self.rate_limit.limit)
                    .window(Duration::from_secs(self.rate_limit.window_secs)),
            )
        } else {
            builder.disable_rate_limit()
        };

        if let Some(ref chat) = self.backend.chat_completion {
            let mut config = ChatCompletionConfig::new()
                .base_url(&chat.base_url)
                .model(&chat.model)
                .timeout(Duration::from_secs(chat.timeout_secs));
            if let Some(key) = secrets.api_key() {
                config = config.api_key(key);
            }
            builder = builder.chat_completion(config);
        }

        builder
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Resolution order:
    /// 1. `~/.tollgate/secrets.toml` (if exists, must be 0600)
    /// 2. `/etc/tollgate/secrets.toml` (if exists, must be 0600)
    ///
    /// Returns empty secrets if no file exists (the key may come from the
    /// environment).
    pub fn load() -> Result<Self> {
        // Try user secrets first
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".tollgate").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets);
            }
        }

        // Try system secrets
        let system_secrets = PathBuf::from("/etc/tollgate/secrets.toml");
        if system_secrets.exists() {
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Load secrets from a specific file, enforcing permissions.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            GatewayError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            GatewayError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            GatewayError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        // Reject if group or other bits are set
        if mode & 0o077 != 0 {
            return Err(GatewayError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// Chat-completion API key, falling back to `OPENAI_API_KEY`.
    pub fn api_key(&self) -> Option<String> {
        self.chat_completion
            .as_ref()
            .map(|s| s.api_key.clone())
            .or_else(|| std::env::var(API_KEY_ENV_VAR).ok())
    }
}
