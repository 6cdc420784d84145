//! Audit client configuration
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Explicit overrides (`with_*` builder methods)
//! 2. Environment variables (`AUDIT_SERVICE_URL`, `AUDIT_ENABLED`, ...)
//! 3. Config file (`from_yaml_file`)
//! 4. Defaults
//!
//! Missing or malformed values never fail: the lower layer's value is kept.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::Result;

pub const DEFAULT_BASE_URL: &str = "http://audit-service:8080/api/v1";
pub const DEFAULT_SERVICE_NAME: &str = "unknown-service";
pub const DEFAULT_SERVICE_VERSION: &str = "1.0.0";
pub const DEFAULT_ENVIRONMENT: &str = "production";

/// Attributes never audited unless an entity type overrides the list
pub const DEFAULT_EXCLUDED_ATTRIBUTES: [&str; 4] =
    ["password", "remember_token", "created_at", "updated_at"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuditClientConfig {
    /// Audit service API root, e.g. `http://audit-service:8080/api/v1`
    pub base_url: String,

    pub service_name: String,
    pub service_version: String,
    pub environment: String,

    /// Whole-request timeout in milliseconds, 0 = no timeout
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds, 0 = no timeout
    pub connect_timeout_ms: u64,

    /// Fire-and-forget dispatch for single events
    #[serde(rename = "async")]
    pub async_dispatch: bool,

    /// Master switch; a disabled client never touches the network
    pub enabled: bool,

    /// Merged into every event
    pub default_metadata: Map<String, Value>,

    pub retry: RetrySettings,

    /// Carried for forward compatibility; buffering is not implemented
    pub buffer: BufferSettings,

    /// Sent as `X-API-Key` when present
    pub api_key: Option<String>,

    pub verify_ssl: bool,

    pub model_auditing: ModelAuditing,
}

/// Transport retry settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts, including the first one
    pub attempts: u32,
    pub delay_ms: u64,
    /// Delay growth per failed attempt; 1.0 keeps it constant
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BufferSettings {
    pub enabled: bool,
    pub size: usize,
    pub flush_interval_secs: u64,
}

/// Entity change-capture settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelAuditing {
    pub enabled: bool,
    pub exclude_attributes: Vec<String>,
}

impl Default for AuditClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            service_version: DEFAULT_SERVICE_VERSION.to_string(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            timeout_ms: 10_000,
            connect_timeout_ms: 5_000,
            async_dispatch: true,
            enabled: true,
            default_metadata: Map::new(),
            retry: RetrySettings::default(),
            buffer: BufferSettings::default(),
            api_key: None,
            verify_ssl: true,
            model_auditing: ModelAuditing::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 1000,
            backoff_multiplier: 1.0,
            max_delay_ms: 30_000,
        }
    }
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            size: 100,
            flush_interval_secs: 60,
        }
    }
}

impl Default for ModelAuditing {
    fn default() -> Self {
        Self {
            enabled: true,
            exclude_attributes: DEFAULT_EXCLUDED_ATTRIBUTES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl RetrySettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl AuditClientConfig {
    /// Defaults overlaid with the process environment
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Load configuration from a YAML file
    ///
    /// Keys absent from the file keep their defaults.
    /// Returns error if the file can't be read or is malformed.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Merge with environment variables
    ///
    /// Environment variables take precedence over file values.
    pub fn with_env(mut self) -> Self {
        if let Some(v) = env_string("AUDIT_SERVICE_URL") {
            self.base_url = v;
        }
        if let Some(v) = env_string("AUDIT_SERVICE_NAME") {
            self.service_name = v;
        }
        if let Some(v) = env_string("AUDIT_SERVICE_VERSION") {
            self.service_version = v;
        }
        if let Some(v) = env_string("AUDIT_ENVIRONMENT") {
            self.environment = v;
        }
        if let Some(v) = env_secs_as_ms("AUDIT_TIMEOUT") {
            self.timeout_ms = v;
        }
        if let Some(v) = env_secs_as_ms("AUDIT_CONNECT_TIMEOUT") {
            self.connect_timeout_ms = v;
        }
        if let Some(v) = env_bool("AUDIT_ASYNC") {
            self.async_dispatch = v;
        }
        if let Some(v) = env_bool("AUDIT_ENABLED") {
            self.enabled = v;
        }
        if let Some(v) = env_parse("AUDIT_RETRY_ATTEMPTS") {
            self.retry.attempts = v;
        }
        if let Some(v) = env_parse("AUDIT_RETRY_DELAY") {
            self.retry.delay_ms = v;
        }
        if let Some(v) = env_bool("AUDIT_BUFFER_ENABLED") {
            self.buffer.enabled = v;
        }
        if let Some(v) = env_parse("AUDIT_BUFFER_SIZE") {
            self.buffer.size = v;
        }
        if let Some(v) = env_parse("AUDIT_BUFFER_FLUSH_INTERVAL") {
            self.buffer.flush_interval_secs = v;
        }
        if let Some(v) = env_string("AUDIT_API_KEY") {
            self.api_key = Some(v);
        }
        if let Some(v) = env_bool("AUDIT_VERIFY_SSL") {
            self.verify_ssl = v;
        }
        if let Some(v) = env_bool("AUDIT_MODEL_AUDITING") {
            self.model_auditing.enabled = v;
        }
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_service(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.service_name = name.into();
        self.service_version = version.into();
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_async(mut self, async_dispatch: bool) -> Self {
        self.async_dispatch = async_dispatch;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// `Duration::ZERO` disables the corresponding timeout
    pub fn with_timeouts(mut self, timeout: Duration, connect_timeout: Duration) -> Self {
        self.timeout_ms = duration_ms(timeout);
        self.connect_timeout_ms = duration_ms(connect_timeout);
        self
    }

    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry = RetrySettings {
            attempts,
            delay_ms: delay.as_millis() as u64,
            ..self.retry
        };
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Add one default metadata entry (merged, not replaced)
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.default_metadata.insert(key.into(), value.into());
        self
    }

    /// `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        non_zero_ms(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero_ms(self.connect_timeout_ms)
    }

    /// `AuditClient/{service_name}/{service_version}`
    pub fn user_agent(&self) -> String {
        format!("AuditClient/{}/{}", self.service_name, self.service_version)
    }

    /// Copy with the api key masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.api_key = copy.api_key.as_deref().map(|k| mask_api_key(k, 4));
        copy
    }
}

/// Mask an API key for display
///
/// Shows first N chars + asterisks, e.g. "ak_1***"
pub fn mask_api_key(key: &str, visible_chars: usize) -> String {
    if key.is_empty() {
        return String::new();
    }

    let visible = key
        .char_indices()
        .nth(visible_chars)
        .map(|(i, _)| i)
        .unwrap_or(key.len());
    format!("{}***", &key[..visible])
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = key, value = %raw, "Ignoring malformed audit config value");
            None
        }
    }
}

/// Seconds (fractions allowed) from the environment, as milliseconds
fn env_secs_as_ms(key: &str) -> Option<u64> {
    let secs: f64 = env_parse(key)?;
    if !secs.is_finite() || secs < 0.0 {
        warn!(var = key, value = secs, "Ignoring negative audit timeout");
        return None;
    }
    Some(duration_ms(Duration::from_secs_f64(secs)))
}

/// Whole milliseconds; a non-zero duration never rounds down to "disabled"
fn duration_ms(duration: Duration) -> u64 {
    if duration.is_zero() {
        return 0;
    }
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn non_zero_ms(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

fn env_bool(key: &str) -> Option<bool> {
    let raw = env_string(key)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!(var = key, value = %raw, "Ignoring malformed audit config flag");
            None
        }
    }
}
