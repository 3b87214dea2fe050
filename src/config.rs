/*!
 * Configuration types for Bardsong
 */

use bardsong_core_resilience::{CircuitBreakerConfig, RetryPolicy, DEFAULT_RETRYABLE_STATUSES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to open log file {}: {source}", .path.display())]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid URL for {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        source: url::ParseError,
    },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BardConfig {
    /// Language the descriptions are filtered by
    #[serde(default = "default_language")]
    pub language: String,

    /// Pick a random description instead of the first one
    #[serde(default)]
    pub random_description: bool,

    #[serde(default)]
    pub species_api: SpeciesApiConfig,

    #[serde(default)]
    pub translation_api: TranslationApiConfig,

    #[serde(default)]
    pub resilience: ResilienceConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for BardConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            random_description: false,
            species_api: SpeciesApiConfig::default(),
            translation_api: TranslationApiConfig::default(),
            resilience: ResilienceConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Species data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesApiConfig {
    #[serde(default = "default_species_base_url")]
    pub base_url: String,

    /// Per-attempt timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SpeciesApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_species_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Stylistic translation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationApiConfig {
    #[serde(default = "default_translation_base_url")]
    pub base_url: String,

    /// Translation style, e.g. "shakespeare"
    #[serde(default = "default_style")]
    pub style: String,

    /// Per-attempt timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TranslationApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_translation_base_url(),
            style: default_style(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Retry and circuit breaker settings shared by both remote APIs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Total attempts per call, initial one included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff seed in milliseconds
    #[serde(default = "default_backoff_seed_ms")]
    pub backoff_seed_ms: u64,

    /// Ceiling for a single backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Qualifying failures before a circuit opens
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds a circuit stays open before probing
    #[serde(default = "default_cooldown_secs")]
    pub circuit_cooldown_secs: u64,

    /// Response statuses worth retrying
    #[serde(default = "default_retryable_statuses")]
    pub retryable_statuses: Vec<u16>,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_seed_ms: default_backoff_seed_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            failure_threshold: default_failure_threshold(),
            circuit_cooldown_secs: default_cooldown_secs(),
            retryable_statuses: default_retryable_statuses(),
        }
    }
}

impl ResilienceConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff_seed: Duration::from_millis(self.backoff_seed_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            fast_first: true,
            retryable_statuses: self.retryable_statuses.clone(),
        }
    }

    pub fn circuit_breaker(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            cooldown: Duration::from_secs(self.circuit_cooldown_secs),
        }
    }
}

/// Translation cache settings (the TTL is fixed, see `cache::CACHE_TTL`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// In-memory cache when true, no caching at all when false
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Diagnostic output settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    /// Log file path (None = stderr)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Informational messages
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "en".to_string()
}

fn default_species_base_url() -> String {
    "https://pokeapi.co/api/v2/".to_string()
}

fn default_translation_base_url() -> String {
    "https://api.funtranslations.com/".to_string()
}

fn default_style() -> String {
    "shakespeare".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    6
}

fn default_backoff_seed_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_failure_threshold() -> u32 {
    1
}

fn default_cooldown_secs() -> u64 {
    30
}

fn default_retryable_statuses() -> Vec<u16> {
    DEFAULT_RETRYABLE_STATUSES.to_vec()
}

impl BardConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: BardConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as pretty TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.species_base_url()?;
        self.translation_base_url()?;

        if self.language.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "language",
                reason: "must not be empty",
            });
        }
        if self.translation_api.style.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "translation_api.style",
                reason: "must not be empty",
            });
        }
        if self.species_api.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "species_api.timeout_secs",
                reason: "must be at least 1",
            });
        }
        if self.translation_api.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "translation_api.timeout_secs",
                reason: "must be at least 1",
            });
        }
        if self.resilience.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "resilience.max_attempts",
                reason: "must be at least 1",
            });
        }
        if self.resilience.failure_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "resilience.failure_threshold",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    pub fn species_base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.species_api.base_url).map_err(|source| ConfigError::InvalidUrl {
            field: "species_api.base_url",
            source,
        })
    }

    pub fn translation_base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.translation_api.base_url).map_err(|source| ConfigError::InvalidUrl {
            field: "translation_api.base_url",
            source,
        })
    }
}
