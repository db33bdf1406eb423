//! HTTP client utilities.

use reqwest::{Client, RequestBuilder};
use std::sync::Arc;
use std::time::Duration;

use crate::config::HttpSettings;
use crate::sources::SourceError;

/// Default user agent sent to every provider
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with sensible defaults
///
/// Cloning is cheap; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, SourceError> {
        Self::with_settings(DEFAULT_USER_AGENT, Duration::from_secs(10), Duration::from_secs(5))
    }

    /// Create a new HTTP client with a custom user agent and timeouts
    pub fn with_settings(
        user_agent: &str,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Create a client from configured HTTP settings
    pub fn from_settings(settings: &HttpSettings) -> Result<Self, SourceError> {
        Self::with_settings(
            &settings.user_agent,
            settings.request_timeout(),
            settings.connect_timeout(),
        )
    }

    /// Create from an existing reqwest Client
    pub fn from_client(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Start a GET request
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        assert!(HttpClient::new().is_ok());
        assert!(HttpClient::with_settings("test-agent/1.0", Duration::from_secs(1), Duration::from_secs(1)).is_ok());
        assert!(HttpClient::from_settings(&HttpSettings::default()).is_ok());
    }
}
