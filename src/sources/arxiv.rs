//! arXiv research source implementation.
//!
//! The export API answers with an Atom document. Only a handful of fields are
//! needed, so entries are pattern-extracted rather than run through a full XML
//! parser; see [`parse_feed`].

use async_trait::async_trait;
use chrono::{DateTime, Datelike};
use regex::Regex;
use reqwest::StatusCode;
use std::sync::LazyLock;

use crate::config::Config;
use crate::models::{Paper, PaperBuilder, SearchQuery, SearchResponse, SourceType};
use crate::sources::{parse_year, status_error, Source, SourceError};
use crate::utils::{with_retry, HttpClient, RetryConfig, RetryOn};

/// Base URL for arXiv API
pub const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

const ARXIV_VENUE: &str = "arXiv";

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<title[^>]*>(.*?)</title>").expect("valid regex"));
static SUMMARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<summary[^>]*>(.*?)</summary>").expect("valid regex"));
static PUBLISHED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<published>(.*?)</published>").expect("valid regex"));
static AUTHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<author>(.*?)</author>").expect("valid regex"));
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<name>(.*?)</name>").expect("valid regex"));
static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<id>(.*?)</id>").expect("valid regex"));
static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("valid regex"));

/// arXiv research source
///
/// No credential is needed. arXiv answers 503 when overloaded, so that status
/// is retried on top of the shared defaults.
#[derive(Debug, Clone)]
pub struct ArxivSource {
    client: HttpClient,
    base_url: String,
    retry: RetryConfig,
}

impl ArxivSource {
    /// Failures this provider retries by default
    pub const RETRY_ON: RetryOn = RetryOn::TIMEOUT
        .union(RetryOn::GATEWAY_TIMEOUT)
        .union(RetryOn::SERVICE_UNAVAILABLE);

    /// Create a new arXiv source
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            base_url: ARXIV_API_URL.to_string(),
            retry: RetryConfig::default().retry_on(Self::RETRY_ON),
        }
    }

    /// Create a source from configuration
    pub fn from_config(client: HttpClient, config: &Config) -> Self {
        Self::new(client)
            .with_base_url(config.endpoints.arxiv.clone())
            .with_retry_config(config.retry_policy(Self::RETRY_ON))
    }

    /// Point the source at a different query endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Replace the retry policy
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Build the `search_query` value: `all:` followed by the terms joined with `+`
    fn build_search_query(query: &str) -> String {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(|term| urlencoding::encode(term).into_owned())
            .collect();
        format!("all:{}", terms.join("+"))
    }

    fn build_url(&self, query: &SearchQuery) -> String {
        format!(
            "{}?search_query={}&start=0&max_results={}&sortBy=submittedDate&sortOrder=descending",
            self.base_url,
            Self::build_search_query(&query.query),
            query.max_results.max(1)
        )
    }

    async fn fetch_feed(client: HttpClient, url: String) -> Result<Option<String>, SourceError> {
        let response = client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(status_error("arXiv", response).await);
        }

        Ok(Some(response.text().await?))
    }
}

#[async_trait]
impl Source for ArxivSource {
    fn source_type(&self) -> SourceType {
        SourceType::Arxiv
    }

    fn retry_config(&self) -> RetryConfig {
        self.retry
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SourceError> {
        let url = self.build_url(query);
        tracing::debug!("Searching arXiv: {}", url);

        let feed = with_retry(self.retry, || Self::fetch_feed(self.client.clone(), url.clone())).await?;

        let papers = match feed {
            Some(xml) => {
                if !xml.contains("<feed") {
                    return Err(SourceError::Parse("arXiv response is not an Atom feed".to_string()));
                }
                parse_feed(&xml)
            }
            None => Vec::new(),
        };

        Ok(SearchResponse::new(papers, self.name(), &query.query))
    }
}

/// Extract papers from an arXiv Atom document
///
/// The document is split on `<entry>`; each segment yields title, summary,
/// publication date, author names and id. Entries without a title are
/// dropped. Every paper gets venue "arXiv" and its id URL as the link.
pub fn parse_feed(xml: &str) -> Vec<Paper> {
    xml.split("<entry>").skip(1).filter_map(parse_entry).collect()
}

fn parse_entry(entry: &str) -> Option<Paper> {
    let entry = entry.split("</entry>").next().unwrap_or(entry);

    let title = capture(&TITLE_RE, entry)?;
    let summary = capture(&SUMMARY_RE, entry);
    let year = capture(&PUBLISHED_RE, entry).and_then(|published| published_year(&published));
    let link = capture(&ID_RE, entry);

    let authors: Vec<String> = AUTHOR_RE
        .captures_iter(entry)
        .filter_map(|author| author.get(1))
        .filter_map(|author| capture(&NAME_RE, author.as_str()))
        .collect();

    PaperBuilder::new(title, SourceType::Arxiv)
        .authors(authors)
        .year(year)
        .abstract_text(summary)
        .venue(Some(ARXIV_VENUE))
        .link(link)
        .build()
}

/// First capture group of `re` in `text`, entity-decoded and trimmed
fn capture(re: &Regex, text: &str) -> Option<String> {
    let raw = re.captures(text)?.get(1)?.as_str();
    let decoded = decode_entities(raw.trim());
    (!decoded.is_empty()).then_some(decoded)
}

fn published_year(published: &str) -> Option<i32> {
    DateTime::parse_from_rfc3339(published.trim())
        .map(|date| date.year())
        .ok()
        .or_else(|| parse_year(published))
}

/// Decode the predefined XML entities and numeric character references
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let numeric = NUMERIC_ENTITY_RE.replace_all(text, |caps: &regex::Captures| {
        let code = &caps[1];
        let value = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse().ok(),
        };
        value
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    numeric
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
