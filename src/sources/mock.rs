//! Mock source for testing purposes.
//!
//! A [`MockSource`] stands in for one provider. Its behavior is scripted per
//! attempt and runs through the same retry loop as the real adapters, so
//! retry counts and backoff timing can be observed.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::models::{Paper, PaperBuilder, SearchQuery, SearchResponse, SourceType};
use crate::sources::{Source, SourceError};
use crate::utils::{with_retry, RetryConfig};

/// A mock source for testing that returns predefined responses.
#[derive(Debug)]
pub struct MockSource {
    source_type: SourceType,
    configured: bool,
    panics: bool,
    retry: RetryConfig,
    delay: Option<Duration>,
    papers: Vec<Paper>,
    failure: Option<SourceError>,
    script: Mutex<VecDeque<Result<Vec<Paper>, SourceError>>>,
    attempts: AtomicU32,
}

impl MockSource {
    /// Create a mock for a provider that answers with no papers
    pub fn new(source_type: SourceType) -> Self {
        Self {
            source_type,
            configured: true,
            panics: false,
            retry: RetryConfig::default(),
            delay: None,
            papers: Vec::new(),
            failure: None,
            script: Mutex::new(VecDeque::new()),
            attempts: AtomicU32::new(0),
        }
    }

    /// Papers returned by every successful attempt
    pub fn with_papers(mut self, papers: Vec<Paper>) -> Self {
        self.papers = papers;
        self
    }

    /// Fail every attempt with this error
    pub fn failing(mut self, error: SourceError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Queue a result for the next attempt; queued results run before the defaults
    pub fn then(self, result: Result<Vec<Paper>, SourceError>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(result);
        }
        self
    }

    /// Sleep this long inside every attempt
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the retry policy
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Report the source as missing its credential
    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    /// Panic instead of answering
    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    /// Number of attempts made so far
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    async fn attempt(&self) -> Result<Vec<Paper>, SourceError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.script.lock().ok().and_then(|mut script| script.pop_front());
        if let Some(result) = scripted {
            return result;
        }

        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(self.papers.clone()),
        }
    }
}

#[async_trait]
impl Source for MockSource {
    fn source_type(&self) -> SourceType {
        self.source_type
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn retry_config(&self) -> RetryConfig {
        self.retry
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SourceError> {
        if self.panics {
            panic!("mock {} source panicked", self.id());
        }

        let this = self;
        let papers = with_retry(self.retry, move || this.attempt()).await?;
        let papers: Vec<Paper> = papers.into_iter().take(query.max_results).collect();

        Ok(SearchResponse::new(papers, self.name(), &query.query))
    }
}

/// Helper function to create a mock paper for testing
///
/// Returns `None` for a blank title, like [`PaperBuilder::build`].
pub fn make_paper(title: &str, source: SourceType, year: Option<i32>, citations: u32) -> Option<Paper> {
    PaperBuilder::new(title, source)
        .year(year)
        .citations(Some(citations))
        .build()
}
