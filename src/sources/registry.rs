//! Registry of the sources a search fans out to.

use std::sync::Arc;

use super::{ArxivSource, CoreSource, SemanticScholarSource, Source, SourceError};
use crate::config::Config;
use crate::models::SourceType;
use crate::utils::HttpClient;

/// Registry for all available research sources
///
/// Sources are kept in [`SourceType`] order (Semantic Scholar, arXiv, CORE)
/// no matter the order they were registered in. Merging walks the registry
/// in this order, which keeps deduplication reproducible. At most one source
/// is held per provider.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn Source>>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with all three providers, sharing one HTTP client
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let client = HttpClient::from_settings(&config.http)?;

        let mut registry = Self::new();
        registry.register(Arc::new(SemanticScholarSource::from_config(client.clone(), config)));
        registry.register(Arc::new(ArxivSource::from_config(client.clone(), config)));
        registry.register(Arc::new(CoreSource::from_config(client, config)));

        Ok(registry)
    }

    /// Register a source, replacing any source for the same provider
    pub fn register(&mut self, source: Arc<dyn Source>) {
        let source_type = source.source_type();
        match self
            .sources
            .binary_search_by_key(&source_type, |s| s.source_type())
        {
            Ok(index) => self.sources[index] = source,
            Err(index) => self.sources.insert(index, source),
        }
    }

    /// Get the source for a provider
    pub fn get(&self, source_type: SourceType) -> Option<&Arc<dyn Source>> {
        self.sources.iter().find(|s| s.source_type() == source_type)
    }

    /// Get a source by ID ("semantic", "arxiv", "core")
    pub fn get_by_id(&self, id: &str) -> Option<&Arc<dyn Source>> {
        SourceType::from_id(id).and_then(|source_type| self.get(source_type))
    }

    /// Get all registered sources, in merge order
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Source>> {
        self.sources.iter()
    }

    /// Get the number of registered sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
