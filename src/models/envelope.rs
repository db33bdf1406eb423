//! Caller-facing response envelope.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aggregator::AggregateResult;
use crate::models::{Paper, SourceHealth, SourceType};

/// Final response for one "search papers" call
///
/// `success` reports that the aggregation itself completed, which it always
/// does. Per-source availability lives in `sources` and `source_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    /// Papers on the requested page
    pub papers: Vec<Paper>,

    /// Number of pages for the requested page size
    pub total_pages: usize,

    /// Requested page number
    pub current_page: usize,

    /// Whether the aggregation completed
    pub success: bool,

    /// Health flag per source
    pub sources: BTreeMap<SourceType, bool>,

    /// Detailed status per source
    pub source_status: SourceHealth,

    /// Papers across all pages, after filtering and deduplication
    pub total_results: usize,
}

impl ResultEnvelope {
    /// Wrap an aggregation result for the page the caller asked for
    pub fn build(result: AggregateResult, page: usize) -> Self {
        Self {
            sources: result.source_health.flags(),
            source_status: result.source_health,
            papers: result.papers,
            total_pages: result.total_pages,
            current_page: page,
            success: true,
            total_results: result.total_count,
        }
    }
}
