//! Fan-out search across every registered source.
//!
//! One request runs the following steps:
//!
//! 1. Every source is queried concurrently, each on its own tokio task.
//! 2. All tasks are awaited; none is raced or cancelled. A source that fails
//!    (or whose task panics) contributes no papers and is marked failed.
//! 3. Paper lists are concatenated in registry order, not completion order.
//! 4. The year filter, deduplication, sorting and pagination run in that order.

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::task::{JoinError, JoinHandle};

use crate::config::Config;
use crate::models::{
    Paper, QueryError, QueryRequest, ResultEnvelope, SearchQuery, SourceHealth, SourceType,
};
use crate::sources::{SourceError, SourceOutcome, SourceRegistry};
use crate::utils::deduplicate_papers;

/// Records requested from each source when nothing else is configured
pub const DEFAULT_PER_SOURCE_LIMIT: usize = 20;

/// Merged, filtered, deduplicated and paged result of one request
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    /// Papers on the requested page
    pub papers: Vec<Paper>,

    /// Papers across all pages, after filtering and deduplication
    pub total_count: usize,

    /// `ceil(total_count / page_size)`, zero when nothing matched
    pub total_pages: usize,

    /// How each source fared
    pub source_health: SourceHealth,
}

/// Runs one query against every registered source and merges the answers
#[derive(Debug, Clone)]
pub struct Aggregator {
    registry: Arc<SourceRegistry>,
    per_source_limit: usize,
}

impl Aggregator {
    pub fn new(registry: SourceRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            per_source_limit: DEFAULT_PER_SOURCE_LIMIT,
        }
    }

    /// Build an aggregator over all three providers
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let registry = SourceRegistry::from_config(config)?;
        Ok(Self::new(registry).with_per_source_limit(config.search.per_source_limit))
    }

    /// Set how many records each source is asked for
    pub fn with_per_source_limit(mut self, limit: usize) -> Self {
        self.per_source_limit = limit.max(1);
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn per_source_limit(&self) -> usize {
        self.per_source_limit
    }

    /// Validate the request, aggregate, and wrap the result for the caller
    ///
    /// Only an invalid request is an error; source failures show up in the
    /// envelope's health fields.
    pub async fn search(&self, request: &QueryRequest) -> Result<ResultEnvelope, QueryError> {
        request.validate()?;
        let result = self.aggregate(request).await;
        Ok(ResultEnvelope::build(result, request.page))
    }

    /// Query every source and merge the answers into one page
    ///
    /// Never fails: when every source is down the result is empty and the
    /// health map says so. The request is trusted as given; a page or page
    /// size of 0 is clamped to 1. Use [`Aggregator::search`] to reject such
    /// requests instead.
    pub async fn aggregate(&self, request: &QueryRequest) -> AggregateResult {
        let page = request.page.max(1);
        let page_size = request.page_size.max(1);
        let (papers, source_health) = self.collect(&request.topic).await;

        let papers = filter_by_year(papers, request.year);
        let mut papers = deduplicate_papers(papers);
        sort_papers(&mut papers);

        let total_count = papers.len();
        let total_pages = total_pages(total_count, page_size);
        let papers = paginate(papers, page, page_size);

        tracing::info!(
            "Search '{}' matched {} papers over {} pages ({} failed sources)",
            request.topic,
            total_count,
            total_pages,
            source_health.failed_count()
        );

        AggregateResult {
            papers,
            total_count,
            total_pages,
            source_health,
        }
    }

    /// Fan out to every source and settle all of them
    ///
    /// Papers come back concatenated in registry order.
    pub async fn collect(&self, topic: &str) -> (Vec<Paper>, SourceHealth) {
        let query = SearchQuery::new(topic).max_results(self.per_source_limit);
        tracing::info!(
            "Searching {} sources for '{}' (up to {} each)",
            self.registry.len(),
            topic,
            self.per_source_limit
        );

        let (source_types, tasks): (Vec<SourceType>, Vec<JoinHandle<SourceOutcome>>) = self
            .registry
            .all()
            .map(|source| {
                let source_type = source.source_type();
                let source = Arc::clone(source);
                let query = query.clone();
                (source_type, tokio::spawn(async move { source.fetch(&query).await }))
            })
            .unzip();

        // join_all yields in spawn order
        let settled = join_all(tasks).await;

        let mut papers = Vec::new();
        let mut health = SourceHealth::new();

        for (source_type, joined) in source_types.into_iter().zip(settled) {
            let outcome = settle(source_type, joined);
            tracing::info!(
                "{}: {} ({} papers)",
                source_type.name(),
                outcome.status(),
                outcome.papers().len()
            );
            health.record(source_type, outcome.status());
            papers.extend(outcome.into_papers());
        }

        (papers, health)
    }

    /// Query a single source without merging, deduplication or paging
    ///
    /// Returns `Ok(None)` when no source is registered for the provider.
    pub async fn search_source(
        &self,
        source_type: SourceType,
        topic: &str,
        limit: usize,
    ) -> Result<Option<SourceOutcome>, QueryError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(QueryError::EmptyTopic);
        }

        let Some(source) = self.registry.get(source_type) else {
            return Ok(None);
        };

        let query = SearchQuery::new(topic).max_results(limit.max(1));
        Ok(Some(source.fetch(&query).await))
    }
}

/// A panicked or cancelled source task counts as failed
fn settle(source_type: SourceType, joined: Result<SourceOutcome, JoinError>) -> SourceOutcome {
    match joined {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!("{} task did not complete: {}", source_type.name(), e);
            SourceOutcome::Failed(SourceError::Other(format!("source task failed: {}", e)))
        }
    }
}

/// Keep papers published in `year`; papers with no known year are dropped
/// whenever a filter is set
pub fn filter_by_year(papers: Vec<Paper>, year: Option<i32>) -> Vec<Paper> {
    match year {
        Some(year) => papers.into_iter().filter(|p| p.year == Some(year)).collect(),
        None => papers,
    }
}

/// Newest first, then most cited; unknown years sort as year 0
///
/// The sort is stable, so ties keep their merge order.
pub fn sort_papers(papers: &mut [Paper]) {
    papers.sort_by(|a, b| {
        b.sort_year()
            .cmp(&a.sort_year())
            .then_with(|| b.citation_count.cmp(&a.citation_count))
    });
}

/// Number of pages needed for `total` items
pub fn total_pages(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// The 1-based `page` of `papers`; empty when the page is out of range
pub fn paginate(papers: Vec<Paper>, page: usize, page_size: usize) -> Vec<Paper> {
    let start = page.saturating_sub(1).saturating_mul(page_size);
    papers.into_iter().skip(start).take(page_size).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceStatus;
    use crate::sources::mock::make_paper;
    use crate::sources::MockSource;
    use crate::utils::RetryConfig;
    use std::time::Duration;

    fn registry(sources: Vec<MockSource>) -> SourceRegistry {
        let mut registry = SourceRegistry::new();
        for source in sources {
            registry.register(Arc::new(source));
        }
        registry
    }

    fn titles(papers: &[Paper]) -> Vec<&str> {
        papers.iter().map(|p| p.title.as_str()).collect()
    }

    fn numbered(source: SourceType, count: usize) -> Vec<Paper> {
        (0..count)
            .map(|i| make_paper(&format!("{} paper {}", source.id(), i), source, Some(2020), 0).unwrap())
            .collect()
    }

    #[test]
    fn test_sort_order() {
        let mut papers = vec![
            make_paper("a", SourceType::Core, None, 100).unwrap(),
            make_paper("b", SourceType::Core, Some(2023), 5).unwrap(),
            make_paper("c", SourceType::Core, Some(2024), 3).unwrap(),
            make_paper("d", SourceType::Core, Some(2024), 10).unwrap(),
        ];
        sort_papers(&mut papers);
        assert_eq!(titles(&papers), vec!["d", "c", "b", "a"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut papers = vec![
            make_paper("first", SourceType::SemanticScholar, Some(2022), 1).unwrap(),
            make_paper("second", SourceType::Arxiv, Some(2022), 1).unwrap(),
        ];
        sort_papers(&mut papers);
        assert_eq!(titles(&papers), vec!["first", "second"]);
    }

    #[test]
    fn test_pagination() {
        let papers = numbered(SourceType::Arxiv, 12);
        assert_eq!(total_pages(papers.len(), 5), 3);
        assert_eq!(paginate(papers.clone(), 1, 5).len(), 5);
        assert_eq!(paginate(papers.clone(), 3, 5).len(), 2);
        assert!(paginate(papers.clone(), 4, 5).is_empty());
        assert_eq!(total_pages(0, 5), 0);
        assert_eq!(total_pages(10, 5), 2);
    }

    #[test]
    fn test_year_filter_drops_unknown_years() {
        let papers = vec![
            make_paper("2021", SourceType::Core, Some(2021), 0).unwrap(),
            make_paper("unknown", SourceType::Core, None, 0).unwrap(),
            make_paper("2020", SourceType::Core, Some(2020), 0).unwrap(),
        ];
        assert_eq!(titles(&filter_by_year(papers.clone(), Some(2021))), vec!["2021"]);
        assert_eq!(filter_by_year(papers, None).len(), 3);
    }

    #[tokio::test]
    async fn test_merges_in_registry_order() {
        // semantic answers last but still wins the duplicate
        let aggregator = Aggregator::new(registry(vec![
            MockSource::new(SourceType::Core)
                .with_papers(vec![make_paper("Shared Title", SourceType::Core, Some(2020), 0).unwrap()]),
            MockSource::new(SourceType::SemanticScholar)
                .with_delay(Duration::from_millis(50))
                .with_papers(vec![make_paper("shared title!", SourceType::SemanticScholar, Some(2020), 0).unwrap()]),
            MockSource::new(SourceType::Arxiv)
                .with_papers(vec![make_paper("Arxiv Only", SourceType::Arxiv, Some(2019), 0).unwrap()]),
        ]));

        let request = QueryRequest::new("anything").unwrap();
        let result = aggregator.aggregate(&request).await;

        assert_eq!(result.total_count, 2);
        assert_eq!(result.papers[0].source, SourceType::SemanticScholar);
        assert_eq!(result.papers[1].title, "Arxiv Only");
        assert!(SourceType::ALL.iter().all(|s| result.source_health.status(*s) == Some(SourceStatus::Ok)));
    }

    #[tokio::test]
    async fn test_total_failure_is_still_a_result() {
        let error = SourceError::Http {
            status: 500,
            message: "down".to_string(),
        };
        let aggregator = Aggregator::new(registry(
            SourceType::ALL
                .into_iter()
                .map(|s| MockSource::new(s).failing(error.clone()))
                .collect(),
        ));

        let request = QueryRequest::new("anything").unwrap();
        let envelope = aggregator.search(&request).await.unwrap();

        assert!(envelope.success);
        assert!(envelope.papers.is_empty());
        assert_eq!(envelope.total_results, 0);
        assert_eq!(envelope.total_pages, 0);
        assert!(envelope.sources.values().all(|ok| !ok));
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_outage() {
        let slow = MockSource::new(SourceType::Arxiv)
            .with_delay(Duration::from_secs(60))
            .with_papers(numbered(SourceType::Arxiv, 3));
        let started = tokio::time::Instant::now();

        let aggregator = Aggregator::new(registry(vec![
            MockSource::new(SourceType::SemanticScholar).with_papers(numbered(SourceType::SemanticScholar, 4)),
            slow,
            MockSource::new(SourceType::Core).with_papers(numbered(SourceType::Core, 3)),
        ]));

        let request = QueryRequest::new("outage").unwrap().page_size(20).unwrap();
        let envelope = aggregator.search(&request).await.unwrap();

        assert_eq!(envelope.total_results, 7);
        assert!(envelope.papers.iter().all(|p| p.source != SourceType::Arxiv));
        assert_eq!(envelope.sources[&SourceType::Arxiv], false);
        assert_eq!(envelope.sources[&SourceType::SemanticScholar], true);
        assert_eq!(envelope.sources[&SourceType::Core], true);

        // four 10s attempts plus 2s + 4s + 6s of backoff
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(52));
        assert!(elapsed < Duration::from_secs(53));
    }

    #[tokio::test]
    async fn test_retried_source_recovers() {
        let flaky = MockSource::new(SourceType::Arxiv)
            .with_retry_config(RetryConfig::default().backoff_step(Duration::from_millis(1)))
            .then(Err(SourceError::Http {
                status: 504,
                message: "gateway timeout".to_string(),
            }))
            .with_papers(numbered(SourceType::Arxiv, 2));

        let aggregator = Aggregator::new(registry(vec![flaky]));
        let result = aggregator.aggregate(&QueryRequest::new("flaky").unwrap()).await;

        assert_eq!(result.total_count, 2);
        assert_eq!(result.source_health.status(SourceType::Arxiv), Some(SourceStatus::Ok));
    }

    #[tokio::test]
    async fn test_panicking_source_counts_as_failed() {
        let aggregator = Aggregator::new(registry(vec![
            MockSource::new(SourceType::SemanticScholar).panicking(),
            MockSource::new(SourceType::Arxiv).with_papers(numbered(SourceType::Arxiv, 1)),
        ]));

        let result = aggregator.aggregate(&QueryRequest::new("panic").unwrap()).await;
        assert_eq!(result.total_count, 1);
        assert_eq!(
            result.source_health.status(SourceType::SemanticScholar),
            Some(SourceStatus::Failed)
        );
    }

    #[tokio::test]
    async fn test_unconfigured_source_is_healthy_but_flagged() {
        let aggregator = Aggregator::new(registry(vec![
            MockSource::new(SourceType::Arxiv).with_papers(numbered(SourceType::Arxiv, 1)),
            MockSource::new(SourceType::Core).unconfigured(),
        ]));

        let envelope = aggregator.search(&QueryRequest::new("keys").unwrap()).await.unwrap();
        assert_eq!(envelope.sources[&SourceType::Core], true);
        assert_eq!(
            envelope.source_status.status(SourceType::Core),
            Some(SourceStatus::Unconfigured)
        );
    }

    #[tokio::test]
    async fn test_per_source_limit_is_passed_down() {
        let aggregator = Aggregator::new(registry(vec![
            MockSource::new(SourceType::Arxiv).with_papers(numbered(SourceType::Arxiv, 30)),
        ]))
        .with_per_source_limit(7);

        let result = aggregator
            .aggregate(&QueryRequest::new("limit").unwrap().page_size(100).unwrap())
            .await;
        assert_eq!(result.total_count, 7);
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected() {
        let aggregator = Aggregator::new(registry(vec![MockSource::new(SourceType::Arxiv)]));
        let mut request = QueryRequest::new("topic").unwrap();
        request.page = 0;

        assert_eq!(aggregator.search(&request).await, Err(QueryError::InvalidPage));
    }

    #[tokio::test]
    async fn test_aggregate_clamps_zero_paging() {
        let aggregator = Aggregator::new(registry(vec![
            MockSource::new(SourceType::Arxiv).with_papers(numbered(SourceType::Arxiv, 3)),
        ]));
        let mut request = QueryRequest::new("clamp").unwrap();
        request.page = 0;
        request.page_size = 0;

        let result = aggregator.aggregate(&request).await;
        assert_eq!(result.total_count, 3);
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.papers.len(), 1);
        assert_eq!(result.papers[0].title, "arxiv paper 0");

        assert_eq!(aggregator.search(&request).await, Err(QueryError::InvalidPage));
    }

    #[tokio::test]
    async fn test_search_source() {
        let aggregator = Aggregator::new(registry(vec![
            MockSource::new(SourceType::Arxiv).with_papers(numbered(SourceType::Arxiv, 5)),
        ]));

        let outcome = aggregator
            .search_source(SourceType::Arxiv, "topic", 3)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.papers().len(), 3);

        assert!(aggregator.search_source(SourceType::Core, "topic", 3).await.unwrap().is_none());
        assert_eq!(
            aggregator.search_source(SourceType::Arxiv, "  ", 3).await.unwrap_err(),
            QueryError::EmptyTopic
        );
    }
}
