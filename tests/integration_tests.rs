//! Integration tests for Paper Fanout
//!
//! These drive the aggregator end to end: real adapters talking to a local
//! mock HTTP server, and scripted mock sources for timing scenarios.

use mockito::{Matcher, Server};
use paper_fanout::config::{load_config, Config};
use paper_fanout::models::{QueryRequest, SourceStatus, SourceType};
use paper_fanout::sources::mock::make_paper;
use paper_fanout::sources::{MockSource, SourceError, SourceRegistry};
use paper_fanout::Aggregator;
use std::sync::Arc;
use std::time::Duration;

const ARXIV_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query</title>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention is all you need</title>
    <summary>The dominant sequence transduction models...</summary>
    <author><name>Ashish Vaswani</name></author>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2405.00001v1</id>
    <published>2024-05-01T00:00:00Z</published>
    <title>Fresh Preprint</title>
    <author><name>New Author</name></author>
  </entry>
</feed>"#;

fn semantic_body() -> String {
    serde_json::json!({
        "total": 2,
        "data": [
            {
                "paperId": "a1",
                "title": "Attention Is All You Need",
                "year": 2017,
                "authors": [{"name": "Ashish Vaswani"}],
                "citationCount": 100000,
                "venue": "NeurIPS",
                "url": "https://www.semanticscholar.org/paper/a1"
            },
            {
                "paperId": "g1",
                "title": "Graph Networks",
                "year": 2021,
                "authors": [{"name": "Peter Battaglia"}],
                "citationCount": 50
            }
        ]
    })
    .to_string()
}

fn core_body() -> String {
    serde_json::json!({
        "totalHits": 2,
        "results": [
            {
                "title": "Graph networks.",
                "authors": [{"name": "Someone Else"}],
                "yearPublished": 2021,
                "citationCount": 7
            },
            {
                "title": "Old Report",
                "yearPublished": "2010-03-01",
                "doi": "10.1000/old"
            }
        ]
    })
    .to_string()
}

/// Configuration pointing every provider at the mock server
fn config_for(server: &Server, core_key: Option<&str>) -> Config {
    let mut config = Config::default();
    config.endpoints.semantic_scholar = server.url();
    config.endpoints.arxiv = format!("{}/api/query", server.url());
    config.endpoints.core = server.url();
    config.api_keys.core = core_key.map(str::to_string);
    config.retry.backoff_step_ms = 1;
    config
}

async fn mock_semantic(server: &mut Server) -> mockito::Mock {
    server
        .mock("GET", "/paper/search")
        .match_query(Matcher::UrlEncoded("query".into(), "attention".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(semantic_body())
        .create_async()
        .await
}

async fn mock_arxiv(server: &mut Server) -> mockito::Mock {
    server
        .mock("GET", "/api/query")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/atom+xml")
        .with_body(ARXIV_FEED)
        .create_async()
        .await
}

#[tokio::test]
async fn test_full_pipeline_against_mock_providers() {
    let mut server = Server::new_async().await;
    let semantic = mock_semantic(&mut server).await;
    let arxiv = mock_arxiv(&mut server).await;
    let core = server
        .mock("GET", "/search/works")
        .match_query(Matcher::UrlEncoded("q".into(), "attention".into()))
        .match_header("authorization", "Bearer test-key")
        .with_status(200)
        .with_body(core_body())
        .create_async()
        .await;

    let aggregator = Aggregator::from_config(&config_for(&server, Some("test-key"))).unwrap();
    let request = QueryRequest::new("attention").unwrap().page_size(3).unwrap();
    let envelope = aggregator.search(&request).await.unwrap();

    semantic.assert_async().await;
    arxiv.assert_async().await;
    core.assert_async().await;

    // duplicates resolve to the Semantic Scholar record
    assert_eq!(envelope.total_results, 4);
    assert_eq!(envelope.total_pages, 2);
    assert_eq!(envelope.current_page, 1);

    let titles: Vec<&str> = envelope.papers.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Fresh Preprint", "Graph Networks", "Attention Is All You Need"]);
    assert_eq!(envelope.papers[1].source, SourceType::SemanticScholar);
    assert_eq!(envelope.papers[2].citation_count, 100000);
    assert!(envelope.sources.values().all(|ok| *ok));

    let second = aggregator
        .search(&request.clone().page(2).unwrap())
        .await
        .unwrap();
    assert_eq!(second.papers.len(), 1);
    assert_eq!(second.papers[0].title, "Old Report");
    assert_eq!(second.papers[0].link.as_deref(), Some("https://doi.org/10.1000/old"));
}

#[tokio::test]
async fn test_year_filter_against_mock_providers() {
    let mut server = Server::new_async().await;
    mock_semantic(&mut server).await;
    mock_arxiv(&mut server).await;

    let aggregator = Aggregator::from_config(&config_for(&server, None)).unwrap();
    let request = QueryRequest::new("attention").unwrap().year(Some(2017));
    let envelope = aggregator.search(&request).await.unwrap();

    assert_eq!(envelope.total_results, 1);
    assert_eq!(envelope.papers[0].title, "Attention Is All You Need");
}

#[tokio::test]
async fn test_provider_failure_and_missing_key() {
    let mut server = Server::new_async().await;
    mock_semantic(&mut server).await;
    let arxiv = server
        .mock("GET", "/api/query")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("internal error")
        .expect(1)
        .create_async()
        .await;
    let core = server
        .mock("GET", "/search/works")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let aggregator = Aggregator::from_config(&config_for(&server, None)).unwrap();
    let envelope = aggregator
        .search(&QueryRequest::new("attention").unwrap().page_size(10).unwrap())
        .await
        .unwrap();

    arxiv.assert_async().await;
    core.assert_async().await;

    assert!(envelope.success);
    assert_eq!(envelope.total_results, 2);
    assert_eq!(envelope.sources[&SourceType::SemanticScholar], true);
    assert_eq!(envelope.sources[&SourceType::Arxiv], false);
    assert_eq!(envelope.sources[&SourceType::Core], true);
    assert_eq!(
        envelope.source_status.status(SourceType::Core),
        Some(SourceStatus::Unconfigured)
    );
}

#[tokio::test]
async fn test_gateway_timeout_is_retried_then_recovers() {
    let mut server = Server::new_async().await;
    // the 504 mock answers until its two expected hits are used up
    let gateway = server
        .mock("GET", "/paper/search")
        .match_query(Matcher::Any)
        .with_status(504)
        .expect(2)
        .create_async()
        .await;
    let recovered = server
        .mock("GET", "/paper/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(semantic_body())
        .expect(1)
        .create_async()
        .await;

    let mut registry = SourceRegistry::new();
    let full = SourceRegistry::from_config(&config_for(&server, None)).unwrap();
    if let Some(semantic) = full.get(SourceType::SemanticScholar) {
        registry.register(Arc::clone(semantic));
    }

    let aggregator = Aggregator::new(registry);
    let result = aggregator
        .aggregate(&QueryRequest::new("attention").unwrap().page_size(10).unwrap())
        .await;

    gateway.assert_async().await;
    recovered.assert_async().await;
    assert_eq!(result.total_count, 2);
    assert_eq!(
        result.source_health.status(SourceType::SemanticScholar),
        Some(SourceStatus::Ok)
    );
}

#[tokio::test]
async fn test_envelope_json_shape() {
    let mut registry = SourceRegistry::new();
    registry.register(Arc::new(
        MockSource::new(SourceType::Arxiv)
            .with_papers(vec![make_paper("Shape", SourceType::Arxiv, Some(2022), 3).unwrap()]),
    ));
    registry.register(Arc::new(MockSource::new(SourceType::Core).unconfigured()));
    registry.register(Arc::new(MockSource::new(SourceType::SemanticScholar).failing(
        SourceError::Http {
            status: 400,
            message: "bad request".to_string(),
        },
    )));

    let envelope = Aggregator::new(registry)
        .search(&QueryRequest::new("shape").unwrap())
        .await
        .unwrap();
    let json = serde_json::to_value(&envelope).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["totalResults"], 1);
    assert_eq!(json["totalPages"], 1);
    assert_eq!(json["currentPage"], 1);
    assert_eq!(json["sources"]["semanticScholar"], false);
    assert_eq!(json["sources"]["arXiv"], true);
    assert_eq!(json["sources"]["core"], true);
    assert_eq!(json["sourceStatus"]["core"], "unconfigured");
    assert_eq!(json["papers"][0]["title"], "Shape");
}

#[tokio::test(start_paused = true)]
async fn test_slow_source_does_not_block_others() {
    let mut registry = SourceRegistry::new();
    registry.register(Arc::new(
        MockSource::new(SourceType::SemanticScholar)
            .with_papers(vec![make_paper("Fast A", SourceType::SemanticScholar, Some(2021), 0).unwrap()]),
    ));
    registry.register(Arc::new(
        MockSource::new(SourceType::Arxiv)
            .with_delay(Duration::from_secs(30))
            .with_papers(vec![make_paper("Never Arrives", SourceType::Arxiv, Some(2021), 0).unwrap()]),
    ));
    registry.register(Arc::new(
        MockSource::new(SourceType::Core)
            .with_papers(vec![make_paper("Fast C", SourceType::Core, Some(2020), 0).unwrap()]),
    ));

    let envelope = Aggregator::new(registry)
        .search(&QueryRequest::new("outage").unwrap())
        .await
        .unwrap();

    let titles: Vec<&str> = envelope.papers.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Fast A", "Fast C"]);
    assert_eq!(envelope.sources[&SourceType::Arxiv], false);
    assert_eq!(
        envelope.source_status.status(SourceType::Arxiv),
        Some(SourceStatus::Failed)
    );
}

#[test]
fn test_config_file_drives_aggregator() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[search]
per_source_limit = 7

[endpoints]
arxiv = "http://127.0.0.1:9/api/query"
"#,
    )
    .unwrap();

    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config.search.per_source_limit, 7);
    assert_eq!(config.endpoints.arxiv, "http://127.0.0.1:9/api/query");

    let aggregator = Aggregator::from_config(&config).unwrap();
    assert_eq!(aggregator.per_source_limit(), 7);
    assert_eq!(aggregator.registry().len(), 3);
}
