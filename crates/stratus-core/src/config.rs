use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Join all errors into a single line
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Pipeline configuration, usually read from `stratus.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Per-provider circuit breaker settings
    #[serde(default)]
    pub breaker: BreakerConfig,

    /// Read-through cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Fallback chain settings
    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// How long a tripped breaker stays open, and how long a failure streak lives
    #[serde(default = "default_breaker_timeout_secs")]
    pub timeout_secs: u64,

    /// Consecutive failures that trip a closed breaker
    #[serde(default = "default_max_fails")]
    pub max_fails: u32,

    /// Consecutive successes a half-open breaker needs before closing
    #[serde(default = "default_attempts_to_recover")]
    pub attempts_to_recover: u32,
}

fn default_breaker_timeout_secs() -> u64 {
    60
}

fn default_max_fails() -> u32 {
    3
}

fn default_attempts_to_recover() -> u32 {
    2
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_breaker_timeout_secs(),
            max_fails: default_max_fails(),
            attempts_to_recover: default_attempts_to_recover(),
        }
    }
}

impl BreakerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// What to do when writing a fresh value back into the cache fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheWritePolicy {
    /// Log the failure and still return the value
    #[default]
    Ignore,
    /// Fail the request with an internal error
    Propagate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a cached reading
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Upper bound on cached cities; least useful entries are evicted first
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: u64,

    #[serde(default)]
    pub write_failure: CacheWritePolicy,
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn default_cache_max_entries() -> u64 {
    10_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            max_entries: default_cache_max_entries(),
            write_failure: CacheWritePolicy::default(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Which error the fallback chain reports when every provider failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackErrorPolicy {
    /// Only the last provider's error
    #[default]
    LastError,
    /// Every provider's error, in attempt order
    Aggregate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FallbackConfig {
    #[serde(default)]
    pub error_policy: FallbackErrorPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse config file")
    }

    /// Load configuration from file, falling back to defaults if it doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        Self::from_toml_str(&contents)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated(path: &Path) -> Result<(Self, ValidationResult)> {
        let config = Self::load(path)?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.breaker.timeout_secs == 0 {
            result.add_error("breaker.timeout_secs", "Breaker timeout must be greater than 0");
        } else if self.breaker.timeout_secs > 3600 {
            result.add_warning(
                "breaker.timeout_secs",
                "Breaker stays open for more than an hour",
            );
        }

        if self.breaker.max_fails == 0 {
            result.add_error("breaker.max_fails", "max_fails must be at least 1");
        }

        if self.breaker.attempts_to_recover == 0 {
            result.add_error(
                "breaker.attempts_to_recover",
                "attempts_to_recover must be at least 1",
            );
        } else if self.breaker.attempts_to_recover > 100 {
            result.add_warning(
                "breaker.attempts_to_recover",
                "Breaker needs more than 100 successes to close",
            );
        }

        if self.cache.ttl_secs == 0 {
            result.add_error("cache.ttl_secs", "Cache TTL must be greater than 0");
        } else if self.cache.ttl_secs > 86_400 {
            result.add_warning("cache.ttl_secs", "Cached weather lives longer than 24 hours");
        }

        if self.cache.max_entries == 0 {
            result.add_error("cache.max_entries", "Cache must hold at least one entry");
        }

        if self.logging.filter.trim().is_empty() {
            result.add_warning("logging.filter", "Empty log filter, falling back to info");
        }

        result
    }
}
