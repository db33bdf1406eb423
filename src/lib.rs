//! # Paper Fanout
//!
//! Concurrent academic paper search across Semantic Scholar, arXiv and CORE.
//!
//! One query fans out to every provider at once. The answers are merged in a
//! fixed provider order, then filtered by year and deduplicated by
//! normalized title. They are sorted newest and most cited first, and cut
//! into pages. A provider that times out or errors never fails the request:
//! it is reported in the per-source health map of the [`ResultEnvelope`].
//!
//! ## Architecture
//!
//! - [`models`]: Papers, query requests, per-source health and the result envelope
//! - [`sources`]: Provider adapters behind the [`Source`] trait, plus the registry
//! - [`aggregator`]: Fan-out, merge, filter, dedupe, sort and paginate
//! - [`utils`]: HTTP client, retry with backoff, deduplication and terminal output
//! - [`config`]: Layered configuration (defaults, TOML file, environment)
//!
//! ## Example
//!
//! ```rust,no_run
//! use paper_fanout::{load_config, Aggregator, QueryRequest};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = load_config(None)?;
//! let aggregator = Aggregator::from_config(&config)?;
//!
//! let request = QueryRequest::new("graph neural networks")?.year(Some(2023));
//! let envelope = aggregator.search(&request).await?;
//! println!("{} results over {} pages", envelope.total_results, envelope.total_pages);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod config;
pub mod models;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use aggregator::{AggregateResult, Aggregator};
pub use config::{load_config, Config, ConfigError};
pub use models::{Paper, QueryError, QueryRequest, ResultEnvelope, SourceHealth, SourceStatus, SourceType};
pub use sources::{Source, SourceError, SourceOutcome, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
