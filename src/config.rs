//! JSON configuration
//!
//! Every field is optional. A file that cannot be read or validated is
//! logged and replaced by the defaults.

use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!("pagediff/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub static_fetch: StaticFetchConfig,
    pub dynamic_fetch: DynamicFetchConfig,
    /// SQLite file holding the latest summary per URL
    pub database_path: String,
    pub notify: NotifyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            static_fetch: StaticFetchConfig::default(),
            dynamic_fetch: DynamicFetchConfig::default(),
            database_path: "webdata.db".to_string(),
            notify: NotifyConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaticFetchConfig {
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    pub user_agent: String,
    pub retry: RetryConfig,
}

impl Default for StaticFetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub initial_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 4_000,
            multiplier: 1.0,
            max_delay_ms: 10_000,
            max_attempts: 3,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(self.initial_delay_ms),
            self.multiplier,
            Duration::from_millis(self.max_delay_ms),
            self.max_attempts,
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DynamicFetchConfig {
    /// Page-load timeout in milliseconds
    pub timeout_ms: u64,
    /// How long to wait for `ready_selector` after navigation
    pub ready_timeout_ms: u64,
    pub ready_selector: String,
    /// Upper bound on simultaneously live browser instances
    pub concurrency: usize,
    /// Hard cap on one render, launch included
    pub deadline_ms: u64,
    pub chrome_executable: Option<String>,
    pub user_agent: Option<String>,
}

impl Default for DynamicFetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            ready_timeout_ms: 10_000,
            ready_selector: "body".to_string(),
            concurrency: 4,
            deadline_ms: 45_000,
            chrome_executable: None,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Endpoint receiving the report as JSON; log-only when unset
    pub webhook_url: Option<String>,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            sender: "pagediff@localhost".to_string(),
            recipient: "operator@localhost".to_string(),
            subject: "Content Differences Detected".to_string(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let retry = &self.static_fetch.retry;
        if retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "static_fetch.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if !(retry.multiplier.is_finite() && retry.multiplier > 0.0) {
            return Err(ConfigError::Invalid(
                "static_fetch.retry.multiplier must be a positive number".to_string(),
            ));
        }
        if retry.initial_delay_ms > retry.max_delay_ms {
            return Err(ConfigError::Invalid(
                "static_fetch.retry.initial_delay_ms exceeds max_delay_ms".to_string(),
            ));
        }
        if self.dynamic_fetch.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "dynamic_fetch.concurrency must be at least 1".to_string(),
            ));
        }
        if self.dynamic_fetch.ready_selector.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "dynamic_fetch.ready_selector must not be empty".to_string(),
            ));
        }
        if let Some(webhook) = &self.notify.webhook_url {
            url::Url::parse(webhook)
                .map_err(|e| ConfigError::Invalid(format!("notify.webhook_url: {}", e)))?;
        }
        Ok(())
    }
}

/// Read and validate a configuration file
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: display.clone(),
        source,
    })?;
    let config: Config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: display,
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Load `path` if given, falling back to defaults on any failure
pub fn load_or_default(path: Option<&Path>) -> Config {
    let Some(path) = path else {
        return Config::default();
    };

    match load_config(path) {
        Ok(config) => {
            tracing::info!("Loaded configuration from {}", path.display());
            config
        }
        Err(e) => {
            tracing::error!("Failed to load configuration file: {}", e);
            Config::default()
        }
    }
}
