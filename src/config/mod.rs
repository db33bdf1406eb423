//! Configuration management.
//!
//! Settings are layered: built-in defaults, then a TOML file, then
//! environment variables prefixed with `PAPER_FANOUT__` (sections and keys
//! separated by `__`, e.g. `PAPER_FANOUT__SEARCH__PER_SOURCE_LIMIT=10`).
//! The conventional `SEMANTIC_SCHOLAR_API_KEY` and `CORE_API_KEY` variables
//! override whatever the layers above produced.

mod file_config;

pub use file_config::write_default_config;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::DEFAULT_PAGE_SIZE;
use crate::sources::{ARXIV_API_URL, CORE_API_BASE, SEMANTIC_API_BASE};
use crate::utils::{RetryConfig, RetryOn, DEFAULT_USER_AGENT};

/// Environment variable prefix for layered settings
pub const ENV_PREFIX: &str = "PAPER_FANOUT";

const APP_DIR: &str = "paper-fanout";
const CONFIG_FILE_NAME: &str = "config.toml";
const REDACTED: &str = "********";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API keys for providers that take one
    pub api_keys: ApiKeys,

    /// Fan-out and paging settings
    pub search: SearchSettings,

    /// HTTP client settings
    pub http: HttpSettings,

    /// Retry policy shared by all sources
    pub retry: RetrySettings,

    /// Provider base URLs
    pub endpoints: Endpoints,

    /// Logging settings
    pub logging: LoggingSettings,
}

/// API keys for external services
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    /// Semantic Scholar API key (optional, for higher rate limits)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_scholar: Option<String>,

    /// CORE API key (required for CORE to be queried)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core: Option<String>,
}

/// Search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Records requested from each source per query
    pub per_source_limit: usize,

    /// Page size when the caller gives none
    pub default_page_size: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            per_source_limit: 20,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Upper bound on one request attempt, in seconds
    pub request_timeout_secs: u64,

    /// Upper bound on establishing a connection, in seconds
    pub connect_timeout_secs: u64,

    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            connect_timeout_secs: 5,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Linear backoff step in milliseconds; retry `n` waits `n` steps
    pub backoff_step_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_step_ms: 2000,
        }
    }
}

/// Provider base URLs, overridable for proxies and tests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub semantic_scholar: String,
    pub arxiv: String,
    pub core: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            semantic_scholar: SEMANTIC_API_BASE.to_string(),
            arxiv: ARXIV_API_URL.to_string(),
            core: CORE_API_BASE.to_string(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,

    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Retry policy for a source that retries the given failure kinds
    ///
    /// Each attempt is bounded by the HTTP request timeout.
    pub fn retry_policy(&self, retry_on: RetryOn) -> RetryConfig {
        RetryConfig::default()
            .max_retries(self.retry.max_retries)
            .backoff_step(Duration::from_millis(self.retry.backoff_step_ms))
            .attempt_timeout(self.http.request_timeout())
            .retry_on(retry_on)
    }

    /// Check values that would make searching impossible
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.per_source_limit == 0 {
            return Err(ConfigError::Invalid("search.per_source_limit must be at least 1".into()));
        }
        if self.search.default_page_size == 0 {
            return Err(ConfigError::Invalid("search.default_page_size must be at least 1".into()));
        }
        if self.http.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("http.request_timeout_secs must be at least 1".into()));
        }
        Ok(())
    }

    /// Copy of this configuration with API keys masked, for display
    pub fn redacted(&self) -> Self {
        let mask = |key: &Option<String>| key.as_ref().map(|_| REDACTED.to_string());
        let mut config = self.clone();
        config.api_keys.semantic_scholar = mask(&self.api_keys.semantic_scholar);
        config.api_keys.core = mask(&self.api_keys.core);
        config
    }

    /// Fill API keys from the conventional environment variables
    fn apply_key_env(&mut self) {
        let key = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        if let Some(value) = key("SEMANTIC_SCHOLAR_API_KEY") {
            self.api_keys.semantic_scholar = Some(value);
        }
        if let Some(value) = key("CORE_API_KEY") {
            self.api_keys.core = Some(value);
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
}

/// Default location of the configuration file, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE_NAME))
}

/// Find an existing configuration file in the default location
pub fn find_config_file() -> Option<PathBuf> {
    default_config_path().filter(|path| path.is_file())
}

/// Load configuration
///
/// An explicit `path` must exist. Without one, the default location is used
/// when a file is there.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let file = match path {
        Some(path) => Some((path.to_path_buf(), true)),
        None => find_config_file().map(|path| (path, false)),
    };

    let environment = ::config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true);

    let mut config = build(file, Some(environment))?;
    config.apply_key_env();
    config.validate()?;

    tracing::debug!(
        "Configuration loaded (semantic key: {}, core key: {})",
        config.api_keys.semantic_scholar.is_some(),
        config.api_keys.core.is_some()
    );

    Ok(config)
}

fn build(
    file: Option<(PathBuf, bool)>,
    environment: Option<::config::Environment>,
) -> Result<Config, ConfigError> {
    let mut builder = ::config::Config::builder();

    if let Some((path, required)) = file {
        tracing::debug!("Reading configuration from {}", path.display());
        builder = builder.add_source(
            ::config::File::from(path)
                .format(::config::FileFormat::Toml)
                .required(required),
        );
    }

    if let Some(environment) = environment {
        builder = builder.add_source(environment);
    }

    Ok(builder.build()?.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn load_file(path: &Path) -> Result<Config, ConfigError> {
        build(Some((path.to_path_buf(), true)), None)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.search.per_source_limit, 20);
        assert_eq!(config.search.default_page_size, 5);
        assert_eq!(config.http.request_timeout_secs, 10);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.backoff_step_ms, 2000);
        assert_eq!(config.endpoints.arxiv, ARXIV_API_URL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_no_sources_yields_defaults() {
        let config = build(None, None).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[api_keys]
core = "core-key"

[search]
per_source_limit = 50

[retry]
backoff_step_ms = 500

[logging]
level = "debug"
format = "json"
"#,
        )
        .unwrap();

        let config = load_file(&path).unwrap();
        assert_eq!(config.api_keys.core.as_deref(), Some("core-key"));
        assert_eq!(config.api_keys.semantic_scholar, None);
        assert_eq!(config.search.per_source_limit, 50);
        assert_eq!(config.search.default_page_size, 5);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.backoff_step_ms, 500);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.endpoints, Endpoints::default());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempdir().unwrap();
        let result = load_file(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.toml");
        fs::write(&path, "invalid = toml = content").unwrap();
        assert!(load_file(&path).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = Config::default();
        config.search.per_source_limit = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.search.default_page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_policy_from_settings() {
        let mut config = Config::default();
        config.retry.max_retries = 1;
        config.retry.backoff_step_ms = 250;
        config.http.request_timeout_secs = 3;

        let policy = config.retry_policy(RetryOn::TIMEOUT);
        assert_eq!(policy.max_retries, 1);
        assert_eq!(policy.backoff_step, Duration::from_millis(250));
        assert_eq!(policy.attempt_timeout, Duration::from_secs(3));
        assert_eq!(policy.retry_on, RetryOn::TIMEOUT);
    }

    #[test]
    fn test_redacted_masks_keys() {
        let mut config = Config::default();
        config.api_keys.core = Some("secret".to_string());

        let redacted = config.redacted();
        assert_eq!(redacted.api_keys.core.as_deref(), Some(REDACTED));
        assert_eq!(redacted.api_keys.semantic_scholar, None);
        assert_eq!(config.api_keys.core.as_deref(), Some("secret"));
    }
}
