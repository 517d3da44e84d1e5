//! Application configuration with layered loading.
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. Compiled defaults
//! 2. TOML file named by `RELAY_CONFIG` (default `config/relay.toml`)
//! 3. `RELAY__*` environment variables (`__` separates nested fields)
//! 4. The two literal overrides the service contract names: `SUI_RPC_URL`
//!    for the primary endpoint and `BIRDEYE_API_KEY` for the metadata API.
//!    A key left as the `YOUR_API_KEY` template is treated as unset.
//!
//! Invalid configurations (empty URLs, zero ceilings) fail at load time.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Placeholder value shipped in config templates; never a real key.
const API_KEY_TEMPLATE: &str = "YOUR_API_KEY";

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IP address to bind. Defaults to `127.0.0.1`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port to listen on. Defaults to `3001`.
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Maximum accepted request body size in bytes. Defaults to 1 MiB.
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    3001
}

fn default_body_limit_bytes() -> usize {
    1024 * 1024
}

/// Primary and fallback Sui RPC endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Primary JSON-RPC endpoint. Overridable via `SUI_RPC_URL`.
    #[serde(default = "default_primary_url")]
    pub primary_url: String,

    /// Secondary endpoint used by the direct-call fallback.
    #[serde(default = "default_fallback_url")]
    pub fallback_url: String,

    /// Timeout for forwarded requests to the primary, in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Timeout for direct fallback calls, in seconds.
    #[serde(default = "default_fallback_timeout_seconds")]
    pub fallback_timeout_seconds: u64,
}

fn default_primary_url() -> String {
    "https://fullnode.mainnet.sui.io:443".to_string()
}

fn default_fallback_url() -> String {
    "https://sui-rpc.publicnode.com".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_fallback_timeout_seconds() -> u64 {
    10
}

/// Birdeye token-metadata API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BirdeyeConfig {
    /// API key. Overridable via `BIRDEYE_API_KEY`; `None` disables lookups.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the Birdeye API.
    #[serde(default = "default_birdeye_base_url")]
    pub base_url: String,

    /// Ceiling on calls started within any trailing one-second window.
    #[serde(default = "default_birdeye_max_per_second")]
    pub max_per_second: usize,

    /// Per-lookup timeout in seconds.
    #[serde(default = "default_birdeye_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_birdeye_base_url() -> String {
    "https://public-api.birdeye.so".to_string()
}

fn default_birdeye_max_per_second() -> usize {
    45
}

fn default_birdeye_timeout_seconds() -> u64 {
    5
}

/// TTL settings for the two cache namespaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Generic RPC response TTL in seconds. Defaults to 300.
    #[serde(default = "default_response_ttl_seconds")]
    pub response_ttl_seconds: u64,

    /// Token metadata TTL in seconds. Defaults to 86400 (one day).
    #[serde(default = "default_metadata_ttl_seconds")]
    pub metadata_ttl_seconds: u64,

    /// Interval between eager expiry sweeps, in seconds.
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

fn default_response_ttl_seconds() -> u64 {
    300
}

fn default_metadata_ttl_seconds() -> u64 {
    86_400
}

fn default_sweep_interval_seconds() -> u64 {
    60
}

/// Server-wide inbound rate limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per window. Defaults to 500.
    #[serde(default = "default_max_per_window")]
    pub max_per_window: u64,

    /// Window length in seconds. Defaults to 60.
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
}

fn default_max_per_window() -> u64 {
    500
}

fn default_window_seconds() -> u64 {
    60
}

/// Admission queue pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// In-flight ceiling toward the primary upstream.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Backlog length beyond which new requests prefer the fallback.
    #[serde(default = "default_overflow_threshold")]
    pub overflow_threshold: usize,

    /// Fixed settle delay before releasing the slot, in milliseconds.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Additional delay per parked waiter, in milliseconds.
    #[serde(default = "default_per_waiter_delay_ms")]
    pub per_waiter_delay_ms: u64,

    /// Cap on the queue-proportional delay, in milliseconds.
    #[serde(default = "default_max_extra_delay_ms")]
    pub max_extra_delay_ms: u64,
}

fn default_max_concurrent() -> usize {
    3
}

fn default_overflow_threshold() -> usize {
    10
}

fn default_settle_delay_ms() -> u64 {
    200
}

fn default_per_waiter_delay_ms() -> u64 {
    50
}

fn default_max_extra_delay_ms() -> u64 {
    500
}

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g. "info", "debug"). Defaults to `"info"`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub birdeye: BirdeyeConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            body_limit_bytes: default_body_limit_bytes(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            primary_url: default_primary_url(),
            fallback_url: default_fallback_url(),
            request_timeout_seconds: default_request_timeout_seconds(),
            fallback_timeout_seconds: default_fallback_timeout_seconds(),
        }
    }
}

impl Default for BirdeyeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_birdeye_base_url(),
            max_per_second: default_birdeye_max_per_second(),
            timeout_seconds: default_birdeye_timeout_seconds(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            response_ttl_seconds: default_response_ttl_seconds(),
            metadata_ttl_seconds: default_metadata_ttl_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { max_per_window: default_max_per_window(), window_seconds: default_window_seconds() }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            overflow_threshold: default_overflow_threshold(),
            settle_delay_ms: default_settle_delay_ms(),
            per_waiter_delay_ms: default_per_waiter_delay_ms(),
            max_extra_delay_ms: default_max_extra_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            upstream: UpstreamConfig::default(),
            birdeye: BirdeyeConfig::default(),
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            queue: QueueConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be parsed, the structure
    /// cannot be deserialized, or validation fails.
    pub fn from_file(config_path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(config_path).required(false))
            .add_source(Environment::with_prefix("RELAY").separator("__"))
            .build()?;

        let mut loaded: Self = builder.try_deserialize()?;
        loaded.apply_env_literals();
        loaded.validate()?;
        Ok(loaded)
    }

    /// Loads configuration from `config/relay.toml` (or `RELAY_CONFIG`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("RELAY_CONFIG").unwrap_or_else(|_| "config/relay.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Applies the two literal env overrides the service contract names.
    fn apply_env_literals(&mut self) {
        if let Ok(url) = std::env::var("SUI_RPC_URL") {
            if !url.trim().is_empty() {
                self.upstream.primary_url = url;
            }
        }
        if let Ok(key) = std::env::var("BIRDEYE_API_KEY") {
            self.birdeye.api_key = Some(key);
        }
        // A templated or blank key behaves the same as no key at all.
        if let Some(key) = &self.birdeye.api_key {
            if key.trim().is_empty() || key == API_KEY_TEMPLATE {
                self.birdeye.api_key = None;
            }
        }
    }

    /// Validates the configuration for correctness.
    fn validate(&self) -> Result<(), ConfigError> {
        for (label, url) in
            [("upstream.primary_url", &self.upstream.primary_url),
             ("upstream.fallback_url", &self.upstream.fallback_url),
             ("birdeye.base_url", &self.birdeye.base_url)]
        {
            if !url.starts_with("http") {
                return Err(ConfigError::Message(format!("{label} must be an http(s) URL")));
            }
        }
        if self.rate_limit.max_per_window == 0 {
            return Err(ConfigError::Message("rate_limit.max_per_window must be > 0".into()));
        }
        if self.birdeye.max_per_second == 0 {
            return Err(ConfigError::Message("birdeye.max_per_second must be > 0".into()));
        }
        if self.queue.max_concurrent == 0 {
            return Err(ConfigError::Message("queue.max_concurrent must be > 0".into()));
        }
        Ok(())
    }

    /// Timeout for forwarded requests to the primary endpoint.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.request_timeout_seconds)
    }

    /// Timeout for direct fallback calls.
    #[must_use]
    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.fallback_timeout_seconds)
    }

    /// Per-lookup timeout for the Birdeye API.
    #[must_use]
    pub fn birdeye_timeout(&self) -> Duration {
        Duration::from_secs(self.birdeye.timeout_seconds)
    }

    /// Interval between cache expiry sweeps.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache.sweep_interval_seconds)
    }
}
