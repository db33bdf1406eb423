//! Semantic Scholar research source implementation.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::models::{Paper, PaperBuilder, SearchQuery, SearchResponse, SourceType};
use crate::sources::{
    decode_records, lenient, lenient_count, lenient_names, lenient_year, status_error, Source,
    SourceError,
};
use crate::utils::{with_retry, HttpClient, RetryConfig, RetryOn};

/// Public Graph API base URL
pub const SEMANTIC_API_BASE: &str = "https://api.semanticscholar.org/graph/v1";

const SEARCH_FIELDS: &str = "title,abstract,year,authors,citationCount,url,venue";
const LOOKUP_FIELDS: &str = "paperId,title,year";
const DETAIL_FIELDS: &str =
    "title,abstract,year,authors,citationCount,venue,publicationVenue,openAccessPdf";

/// Candidates considered when resolving a title to a paper
const LOOKUP_CANDIDATES: usize = 5;

/// Semantic Scholar research source
///
/// Uses the Semantic Scholar Graph REST API. An API key is optional and only
/// raises rate limits.
#[derive(Debug, Clone)]
pub struct SemanticScholarSource {
    client: HttpClient,
    base_url: String,
    api_key: Option<String>,
    retry: RetryConfig,
}

impl SemanticScholarSource {
    /// Failures this provider retries by default
    pub const RETRY_ON: RetryOn = RetryOn::TIMEOUT.union(RetryOn::GATEWAY_TIMEOUT);

    /// Create a new Semantic Scholar source
    pub fn new(client: HttpClient, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: SEMANTIC_API_BASE.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            retry: RetryConfig::default().retry_on(Self::RETRY_ON),
        }
    }

    /// Create a source from configuration
    pub fn from_config(client: HttpClient, config: &Config) -> Self {
        Self::new(client, config.api_keys.semantic_scholar.clone())
            .with_base_url(config.endpoints.semantic_scholar.clone())
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

    /// GET a JSON document; 404 means there is nothing there
    async fn get_json<T: DeserializeOwned>(
        client: HttpClient,
        url: String,
        api_key: Option<String>,
        params: Vec<(&'static str, String)>,
    ) -> Result<Option<T>, SourceError> {
        let mut request = client.get(&url).query(&params);
        if let Some(key) = api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(status_error("Semantic Scholar", response).await);
        }

        let body = response.text().await?;
        Ok(Some(serde_json::from_str(&body)?))
    }

    /// Run a GET through the retry policy
    async fn request<T: DeserializeOwned>(
        &self,
        url: String,
        params: Vec<(&'static str, String)>,
    ) -> Result<Option<T>, SourceError> {
        with_retry(self.retry, || {
            Self::get_json::<T>(
                self.client.clone(),
                url.clone(),
                self.api_key.clone(),
                params.clone(),
            )
        })
        .await
    }

    async fn search_raw(&self, query: &str, limit: usize) -> Result<Vec<S2Paper>, SourceError> {
        let url = format!("{}/paper/search", self.base_url);
        let params = vec![
            ("query", query.to_string()),
            ("fields", SEARCH_FIELDS.to_string()),
            ("limit", limit.to_string()),
        ];

        let response: Option<S2SearchResponse> = self.request(url, params).await?;
        Ok(response
            .map(|r| decode_records("Semantic Scholar", r.data))
            .unwrap_or_default())
    }

    /// Resolve a title to a paper and return its abstract
    ///
    /// Looks at the top five search hits, preferring a case-insensitive exact
    /// title match from the same year and falling back to the first hit. The
    /// paper detail is then fetched with the same retry policy. Returns
    /// `Ok(None)` when nothing matches or the paper has no abstract.
    pub async fn lookup_abstract(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> Result<Option<AbstractDetails>, SourceError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SourceError::InvalidRequest("title must not be empty".to_string()));
        }

        let url = format!("{}/paper/search", self.base_url);
        let params = vec![
            ("query", title.to_string()),
            ("fields", LOOKUP_FIELDS.to_string()),
            ("limit", LOOKUP_CANDIDATES.to_string()),
        ];
        let candidates: Vec<S2Paper> = self
            .request::<S2SearchResponse>(url, params)
            .await?
            .map(|r| decode_records("Semantic Scholar", r.data))
            .unwrap_or_default();

        let wanted = title.to_lowercase();
        let chosen = candidates
            .iter()
            .find(|c| {
                year.is_some()
                    && c.year == year
                    && c.title.as_deref().map(|t| t.trim().to_lowercase()) == Some(wanted.clone())
            })
            .or_else(|| candidates.first());

        let Some(paper_id) = chosen.and_then(|c| c.paper_id.clone()) else {
            tracing::debug!("No Semantic Scholar match for '{}'", title);
            return Ok(None);
        };

        let url = format!("{}/paper/{}", self.base_url, urlencoding::encode(&paper_id));
        let params = vec![("fields", DETAIL_FIELDS.to_string())];
        let Some(detail) = self.request::<S2Paper>(url, params).await? else {
            return Ok(None);
        };

        Ok(AbstractDetails::from_detail(paper_id, detail))
    }

    /// Map one Semantic Scholar record into a paper
    fn parse_paper(data: S2Paper) -> Option<Paper> {
        let venue = data.venue_name();
        PaperBuilder::new(data.title.unwrap_or_default(), SourceType::SemanticScholar)
            .authors(data.authors)
            .year(data.year)
            .abstract_text(data.r#abstract)
            .citations(data.citation_count)
            .venue(venue)
            .link(data.url)
            .build()
    }
}

#[async_trait]
impl Source for SemanticScholarSource {
    fn source_type(&self) -> SourceType {
        SourceType::SemanticScholar
    }

    fn retry_config(&self) -> RetryConfig {
        self.retry
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SourceError> {
        let limit = query.max_results.clamp(1, 100);
        let records = self.search_raw(&query.query, limit).await?;

        let papers: Vec<Paper> = records.into_iter().filter_map(Self::parse_paper).collect();
        Ok(SearchResponse::new(papers, self.name(), &query.query))
    }
}

/// Abstract and bibliographic details for one resolved paper
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbstractDetails {
    pub paper_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub venue: Option<String>,
    pub citation_count: u32,
    pub r#abstract: String,
    pub open_access_pdf: Option<String>,
}

impl AbstractDetails {
    fn from_detail(paper_id: String, detail: S2Paper) -> Option<Self> {
        let venue = detail.venue_name();
        let r#abstract = detail.r#abstract.filter(|a| !a.trim().is_empty())?;

        Some(Self {
            paper_id,
            title: detail.title.unwrap_or_default(),
            authors: detail
                .authors
                .into_iter()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect(),
            year: detail.year,
            venue,
            citation_count: detail.citation_count.unwrap_or(0),
            r#abstract: r#abstract.trim().to_string(),
            open_access_pdf: detail.open_access_pdf.and_then(|p| p.url),
        })
    }
}

// Semantic Scholar API response types

#[derive(Debug, Deserialize)]
struct S2SearchResponse {
    #[serde(default)]
    data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct S2Paper {
    #[serde(default, deserialize_with = "lenient")]
    paper_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    r#abstract: Option<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    year: Option<i32>,
    #[serde(default, deserialize_with = "lenient_names")]
    authors: Vec<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    citation_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    venue: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    publication_venue: Option<S2Venue>,
    #[serde(default, deserialize_with = "lenient")]
    open_access_pdf: Option<S2OpenAccessPdf>,
}

impl S2Paper {
    fn venue_name(&self) -> Option<String> {
        self.venue
            .clone()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.publication_venue.as_ref().and_then(|v| v.name.clone()))
    }
}

#[derive(Debug, Deserialize)]
struct S2Venue {
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2OpenAccessPdf {
    #[serde(default, deserialize_with = "lenient")]
    url: Option<String>,
}
