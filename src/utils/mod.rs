//! Utility modules supporting the aggregation pipeline.
//!
//! - [`deduplicate_papers`]: Remove papers whose normalized titles collide, first one wins
//! - [`HttpClient`]: Shared HTTP client with configured timeouts
//! - [`RetryConfig`]: Per-source retry policy with linear backoff
//! - [`with_retry`]: Execute an operation, retrying the failures the policy allows
//! - [`render_envelope`]: Terminal rendering of a result envelope
//!
//! # Deduplication
//!
//! ```rust
//! use paper_fanout::models::{PaperBuilder, SourceType};
//! use paper_fanout::utils::deduplicate_papers;
//!
//! let papers = vec![
//!     PaperBuilder::new("Deep Learning: A Survey", SourceType::SemanticScholar).build().unwrap(),
//!     PaperBuilder::new("deep learning a survey", SourceType::Arxiv).build().unwrap(),
//! ];
//! let unique = deduplicate_papers(papers);
//! assert_eq!(unique.len(), 1);
//! assert_eq!(unique[0].source, SourceType::SemanticScholar);
//! ```
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use paper_fanout::sources::SourceError;
//! use paper_fanout::utils::{with_retry, RetryConfig, RetryOn};
//!
//! # async fn fetch_data() -> Result<String, SourceError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), SourceError> {
//! let config = RetryConfig::default()
//!     .max_retries(3)
//!     .retry_on(RetryOn::TIMEOUT | RetryOn::SERVICE_UNAVAILABLE);
//! let data = with_retry(config, fetch_data).await?;
//! # Ok(())
//! # }
//! ```

mod dedup;
mod display;
mod http;
mod retry;

pub use dedup::{are_duplicates, deduplicate_papers, title_key};
pub use display::{
    calculate_column_widths, health_table, is_terminal, paper_table_columns, papers_table,
    render_envelope, terminal_info, terminal_width, truncate_at_word, truncate_with_ellipsis,
    ColumnConfig, Terminal, DEFAULT_WIDTH,
};
pub use http::{HttpClient, DEFAULT_USER_AGENT};
pub use retry::{with_retry, RetryConfig, RetryOn, TransientError};
