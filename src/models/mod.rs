//! Core data models for research papers and search operations.

mod envelope;
mod health;
mod paper;
mod search;

pub use envelope::ResultEnvelope;
pub use health::{SourceHealth, SourceStatus};
pub use paper::{collapse_whitespace, Paper, PaperBuilder, SourceType, UNKNOWN_AUTHOR};
pub use search::{
    QueryError, QueryRequest, SearchQuery, SearchResponse, DEFAULT_PAGE, DEFAULT_PAGE_SIZE,
};
