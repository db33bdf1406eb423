//! CORE research source implementation.
//!
//! Uses the CORE v3 API for searching open access research outputs.
//! API documentation: https://core.ac.uk/services/api
//!
//! CORE requires a free API key from https://core.ac.uk/register. Without
//! one the source reports itself unconfigured and is never called.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::config::Config;
use crate::models::{Paper, PaperBuilder, SearchQuery, SearchResponse, SourceType};
use crate::sources::{
    decode_records, lenient, lenient_count, lenient_names, lenient_year, status_error, Source,
    SourceError,
};
use crate::utils::{with_retry, HttpClient, RetryConfig, RetryOn};

/// Public v3 API base URL
pub const CORE_API_BASE: &str = "https://api.core.ac.uk/v3";

/// CORE research source
#[derive(Debug, Clone)]
pub struct CoreSource {
    client: HttpClient,
    base_url: String,
    api_key: Option<String>,
    retry: RetryConfig,
}

impl CoreSource {
    /// Failures this provider retries by default
    pub const RETRY_ON: RetryOn = RetryOn::TIMEOUT.union(RetryOn::GATEWAY_TIMEOUT);

    pub fn new(client: HttpClient, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: CORE_API_BASE.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            retry: RetryConfig::default().retry_on(Self::RETRY_ON),
        }
    }

    /// Create a source from configuration
    pub fn from_config(client: HttpClient, config: &Config) -> Self {
        Self::new(client, config.api_keys.core.clone())
            .with_base_url(config.endpoints.core.clone())
            .with_retry_config(config.retry_policy(Self::RETRY_ON))
    }

    /// Point the source at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replace the retry policy
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// One search attempt; 404 means nothing matched
    async fn send_search(
        client: HttpClient,
        url: String,
        api_key: String,
        params: [(&'static str, String); 3],
    ) -> Result<Option<CoreResponse>, SourceError> {
        let response = client
            .get(&url)
            .query(&params)
            .header("Authorization", format!("Bearer {}", api_key))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(status_error("CORE", response).await);
        }

        let body = response.text().await?;
        Ok(Some(serde_json::from_str(&body)?))
    }

    fn parse_result(item: CoreWork) -> Option<Paper> {
        let link = item.download_url.filter(|u| !u.trim().is_empty()).or_else(|| {
            item.doi
                .filter(|d| !d.trim().is_empty())
                .map(|doi| format!("https://doi.org/{}", doi.trim()))
        });

        PaperBuilder::new(item.title.unwrap_or_default(), SourceType::Core)
            .authors(item.authors)
            .year(item.year_published)
            .abstract_text(item.r#abstract)
            .citations(item.citation_count)
            .venue(item.publisher)
            .link(link)
            .build()
    }
}

#[async_trait]
impl Source for CoreSource {
    fn source_type(&self) -> SourceType {
        SourceType::Core
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn retry_config(&self) -> RetryConfig {
        self.retry
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SourceError> {
        let Some(api_key) = self.api_key.clone() else {
            return Err(SourceError::InvalidRequest("CORE API key is not configured".to_string()));
        };

        let url = format!("{}/search/works", self.base_url);
        let params = [
            ("q", query.query.clone()),
            ("limit", query.max_results.clamp(1, 100).to_string()),
            ("offset", "0".to_string()),
        ];

        let response = with_retry(self.retry, || {
            Self::send_search(self.client.clone(), url.clone(), api_key.clone(), params.clone())
        })
        .await?;

        let Some(response) = response else {
            return Ok(SearchResponse::new(Vec::new(), self.name(), &query.query));
        };

        let total = response.total_hits;
        let works: Vec<CoreWork> = decode_records("CORE", response.results);
        let papers: Vec<Paper> = works.into_iter().filter_map(Self::parse_result).collect();

        let mut result = SearchResponse::new(papers, self.name(), &query.query);
        if let Some(total) = total {
            result = result.total_results(total);
        }
        Ok(result)
    }
}

/// CORE API response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoreResponse {
    #[serde(default)]
    total_hits: Option<usize>,
    #[serde(default)]
    results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoreWork {
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_names")]
    authors: Vec<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    year_published: Option<i32>,
    #[serde(default, deserialize_with = "lenient")]
    r#abstract: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    download_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    doi: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    publisher: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    citation_count: Option<u32>,
}
