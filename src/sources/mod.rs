//! Research source adapters with a shared trait-based interface.
//!
//! This module defines the [`Source`] trait that every provider adapter
//! implements. Each adapter knows how to query one external provider, how to
//! map its native response into [`Paper`] records, and which failures it is
//! willing to retry.
//!
//! # Sources
//!
//! - `semantic` - Semantic Scholar Graph API (JSON)
//! - `arxiv` - arXiv export API (Atom document, pattern-extracted)
//! - `core` - CORE v3 API (JSON, requires an API key)
//!
//! # Outcomes
//!
//! [`Source::search`] may fail; [`Source::fetch`] never does. It folds every
//! error into a [`SourceOutcome`] so one provider cannot abort a fan-out.
//! A source that needs a credential it does not have is reported as
//! [`SourceOutcome::Skipped`] without touching the network.

mod arxiv;
mod core;
mod registry;
mod semantic;

pub mod mock;

pub use arxiv::{parse_feed, ArxivSource, ARXIV_API_URL};
pub use self::core::{CoreSource, CORE_API_BASE};
pub use mock::MockSource;
pub use registry::SourceRegistry;
pub use semantic::{AbstractDetails, SemanticScholarSource, SEMANTIC_API_BASE};

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::{Paper, SearchQuery, SearchResponse, SourceStatus, SourceType};
use crate::utils::RetryConfig;

/// The Source trait defines the interface for all provider adapters.
///
/// # Implementing a New Source
///
/// 1. Create a struct that implements `Source`
/// 2. Implement `source_type`, `retry_config` and `search`
/// 3. Override `is_configured` if the provider needs a credential
/// 4. Add the source to `SourceRegistry::from_config()` or register it dynamically
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Provider this adapter talks to
    fn source_type(&self) -> SourceType;

    /// Unique identifier for this source (e.g. "arxiv", "semantic")
    fn id(&self) -> &str {
        self.source_type().id()
    }

    /// Human-readable name of this source
    fn name(&self) -> &str {
        self.source_type().name()
    }

    /// Whether every credential this source needs is present
    fn is_configured(&self) -> bool {
        true
    }

    /// Retry policy applied to each request this source makes
    fn retry_config(&self) -> RetryConfig;

    /// Search for papers matching the query
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SourceError>;

    /// Search and settle into an outcome; never fails
    async fn fetch(&self, query: &SearchQuery) -> SourceOutcome {
        if !self.is_configured() {
            tracing::info!("{} is not configured, skipping", self.name());
            return SourceOutcome::Skipped;
        }

        match self.search(query).await {
            Ok(response) => {
                tracing::debug!(
                    "{} returned {} papers for '{}'",
                    self.name(),
                    response.papers.len(),
                    query.query
                );
                SourceOutcome::Success(response.papers)
            }
            Err(e) => {
                tracing::warn!("Search failed for {}: {}", self.id(), e);
                SourceOutcome::Failed(e)
            }
        }
    }
}

/// Settled result of one source for one query
#[derive(Debug)]
pub enum SourceOutcome {
    /// The source answered
    Success(Vec<Paper>),
    /// The source is unconfigured and was not called
    Skipped,
    /// The source failed after any retries
    Failed(SourceError),
}

impl SourceOutcome {
    /// Health status for this outcome
    pub fn status(&self) -> SourceStatus {
        match self {
            SourceOutcome::Success(_) => SourceStatus::Ok,
            SourceOutcome::Skipped => SourceStatus::Unconfigured,
            SourceOutcome::Failed(_) => SourceStatus::Failed,
        }
    }

    /// Whether the outcome counts as healthy
    pub fn is_success(&self) -> bool {
        self.status().is_healthy()
    }

    /// Papers carried by this outcome (empty unless `Success`)
    pub fn papers(&self) -> &[Paper] {
        match self {
            SourceOutcome::Success(papers) => papers,
            _ => &[],
        }
    }

    /// Take the papers out of this outcome
    pub fn into_papers(self) -> Vec<Paper> {
        match self {
            SourceOutcome::Success(papers) => papers,
            _ => Vec::new(),
        }
    }
}

/// Errors that can occur when interacting with a source
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    /// Connection-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// A single attempt ran past its timeout
    #[error("Request timed out")]
    Timeout,

    /// The provider answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Parsing error (XML, JSON, etc.)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else if let Some(status) = err.status() {
            SourceError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

/// Longest response body excerpt kept in an error message
const ERROR_BODY_LIMIT: usize = 200;

/// Build an error for a non-success response, keeping a short body excerpt
pub(crate) async fn status_error(provider: &str, response: reqwest::Response) -> SourceError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(ERROR_BODY_LIMIT).collect();

    SourceError::Http {
        status: status.as_u16(),
        message: format!("{} API returned status {}: {}", provider, status, excerpt.trim()),
    }
}

/// Parse the leading four-digit year of a date-like string ("2023", "2023-05-01")
pub(crate) fn parse_year(text: &str) -> Option<i32> {
    let text = text.trim();
    let digits = text.get(..4)?;
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if text.chars().nth(4).is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Deserialize a year that may be a number, a date string, or garbage
pub(crate) fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Some(Value::String(s)) => parse_year(&s),
        _ => None,
    })
}

/// Deserialize a count that may be missing, negative or a string
pub(crate) fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|c| u32::try_from(c).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Deserialize an optional field, treating a wrong-typed value as absent
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Deserialize an author list of `{"name": ...}` objects
///
/// A null or non-array list is empty; entries without a string name are skipped.
pub(crate) fn lenient_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(items)) = value else {
        return Ok(Vec::new());
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item.get("name") {
            Some(Value::String(name)) => Some(name.clone()),
            _ => None,
        })
        .collect())
}

/// Decode each record on its own so one malformed entry cannot sink the batch
pub(crate) fn decode_records<T: serde::de::DeserializeOwned>(provider: &str, items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!("Skipping malformed {} record: {}", provider, e);
                None
            }
        })
        .collect()
}
