//! TOML configuration for the retrieval service and its collaborators.
//!
//! Every table and key is optional; missing values fall back to defaults
//! that reproduce plain cache-first behaviour (no deadline, no retries,
//! presence-based cache hits, synthetic provider).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on configured retries.
pub const MAX_RETRIES_LIMIT: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// When a cached answer is good enough to skip the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheHitPolicy {
    /// Any cached record inside the range counts as a hit.
    #[default]
    Presence,
    /// Every weekday of the range must be cached; gaps go to the provider.
    Complete,
}

/// Which provider the binary wires up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Synthetic,
    Offline,
}

/// `[service]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Deadline for a single provider fetch; `None` waits indefinitely.
    pub fetch_timeout_ms: Option<u64>,
    pub cache_hit_policy: CacheHitPolicy,
}

/// `[retry]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 250,
            max_delay_ms: 4_000,
        }
    }
}

/// `[cache]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Applied once at start-up when set.
    pub evict_older_than_days: Option<u32>,
}

/// `[provider]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Consecutive failures before the circuit breaker opens.
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Synthetic,
            failure_threshold: 3,
            cooldown_secs: 30 * 60,
        }
    }
}

/// Full configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub service: FetchConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub provider: ProviderConfig,
}

impl ServiceConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.fetch_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "service.fetch_timeout_ms must be positive (omit it to disable the deadline)".into(),
            ));
        }
        if self.retry.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "retry.max_retries must be at most {MAX_RETRIES_LIMIT}, got {}",
                self.retry.max_retries
            )));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            )));
        }
        if self.provider.failure_threshold == 0 {
            return Err(ConfigError::Invalid(
                "provider.failure_threshold must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.service.fetch_timeout_ms.map(Duration::from_millis)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.provider.cooldown_secs)
    }
}
