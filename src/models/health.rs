//! Per-source health reporting.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::SourceType;

/// How a single source fared for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    /// The source answered (possibly with zero papers)
    Ok,
    /// The source needs a credential that is not configured and was skipped
    Unconfigured,
    /// The source timed out, returned an error status or an unreadable payload
    Failed,
}

impl SourceStatus {
    /// Boolean health flag; a skipped source counts as healthy
    pub fn is_healthy(&self) -> bool {
        !matches!(self, SourceStatus::Failed)
    }
}

impl std::fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SourceStatus::Ok => "ok",
            SourceStatus::Unconfigured => "unconfigured",
            SourceStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Status of every source consulted for one request, in merge order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceHealth(BTreeMap<SourceType, SourceStatus>);

impl SourceHealth {
    /// Create an empty health map
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the status of a source
    pub fn record(&mut self, source: SourceType, status: SourceStatus) {
        self.0.insert(source, status);
    }

    /// Status of a source, if it was consulted
    pub fn status(&self, source: SourceType) -> Option<SourceStatus> {
        self.0.get(&source).copied()
    }

    /// Whether a source was consulted and did not fail
    pub fn is_healthy(&self, source: SourceType) -> bool {
        self.status(source).is_some_and(|s| s.is_healthy())
    }

    /// Boolean flags per source
    pub fn flags(&self) -> BTreeMap<SourceType, bool> {
        self.0.iter().map(|(k, v)| (*k, v.is_healthy())).collect()
    }

    /// Iterate over sources and their status
    pub fn iter(&self) -> impl Iterator<Item = (SourceType, SourceStatus)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    /// Number of sources that failed
    pub fn failed_count(&self) -> usize {
        self.0.values().filter(|s| !s.is_healthy()).count()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
