//! Search request and response models.

use serde::{Deserialize, Serialize};

use crate::models::Paper;

/// Default page number for inbound queries
pub const DEFAULT_PAGE: usize = 1;

/// Default page size for inbound queries
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Errors for inbound query parameters, raised before any source is contacted
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Topic is required")]
    EmptyTopic,

    #[error("Page must be at least 1")]
    InvalidPage,

    #[error("Page size must be at least 1")]
    InvalidPageSize,
}

/// One logical "search papers" call from the caller
///
/// Constructed per call and validated up front; an invalid request never
/// reaches the sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// Free-text topic, trimmed
    pub topic: String,

    /// Exact publication year filter
    pub year: Option<i32>,

    /// 1-based page number
    pub page: usize,

    /// Papers per page
    pub page_size: usize,
}

impl QueryRequest {
    /// Create a request for `topic` with default paging
    pub fn new(topic: impl Into<String>) -> Result<Self, QueryError> {
        let topic = topic.into().trim().to_string();
        if topic.is_empty() {
            return Err(QueryError::EmptyTopic);
        }

        Ok(Self {
            topic,
            year: None,
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Set year filter
    pub fn year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    /// Set page number
    pub fn page(mut self, page: usize) -> Result<Self, QueryError> {
        if page == 0 {
            return Err(QueryError::InvalidPage);
        }
        self.page = page;
        Ok(self)
    }

    /// Set page size
    pub fn page_size(mut self, page_size: usize) -> Result<Self, QueryError> {
        if page_size == 0 {
            return Err(QueryError::InvalidPageSize);
        }
        self.page_size = page_size;
        Ok(self)
    }

    /// Re-check the invariants, for requests built by deserialization
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.topic.trim().is_empty() {
            return Err(QueryError::EmptyTopic);
        }
        if self.page == 0 {
            return Err(QueryError::InvalidPage);
        }
        if self.page_size == 0 {
            return Err(QueryError::InvalidPageSize);
        }
        Ok(())
    }
}

/// Query parameters handed to a single source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Main search query string
    pub query: String,

    /// Maximum number of results to return
    pub max_results: usize,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            query: String::new(),
            max_results: 10,
        }
    }
}

impl SearchQuery {
    /// Create a new search query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Set maximum results
    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }
}

/// Papers returned by one source for one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Papers found
    pub papers: Vec<Paper>,

    /// Total number of results reported by the provider (may be more than returned)
    pub total_results: Option<usize>,

    /// Source of the results
    pub source: String,

    /// Query that was executed
    pub query: String,
}

impl SearchResponse {
    /// Create a new search response
    pub fn new(papers: Vec<Paper>, source: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            papers,
            total_results: None,
            source: source.into(),
            query: query.into(),
        }
    }

    /// Set total results
    pub fn total_results(mut self, total: usize) -> Self {
        self.total_results = Some(total);
        self
    }
}
