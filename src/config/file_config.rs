//! Configuration file support.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api_keys]
//! semantic_scholar = "your-api-key"
//! core = "your-core-api-key"
//!
//! [search]
//! per_source_limit = 20
//! default_page_size = 5
//!
//! [http]
//! request_timeout_secs = 10
//! connect_timeout_secs = 5
//! user_agent = "paper-fanout/0.1.0"
//!
//! [retry]
//! max_retries = 3
//! backoff_step_ms = 2000
//!
//! [endpoints]
//! semantic_scholar = "https://api.semanticscholar.org/graph/v1"
//! arxiv = "http://export.arxiv.org/api/query"
//! core = "https://api.core.ac.uk/v3"
//!
//! [logging]
//! level = "warn"
//! format = "text"
//! ```

use std::path::Path;

use super::{Config, ConfigError};

impl Config {
    /// Render this configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save configuration to a TOML file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}

/// Write a configuration file holding every default value
///
/// Refuses to replace an existing file unless `force` is set.
pub fn write_default_config(path: &Path, force: bool) -> Result<(), ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()));
    }

    Config::default().save(path)?;
    tracing::info!("Wrote default configuration to {}", path.display());
    Ok(())
}
