//! Paper model representing a research paper from any source.

use serde::{Deserialize, Serialize};

/// Author placeholder used when a provider returns no author names
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// The provider where the paper was found
///
/// Variant order is the fixed merge order used by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceType {
    #[serde(rename = "semanticScholar")]
    SemanticScholar,
    #[serde(rename = "arXiv")]
    Arxiv,
    #[serde(rename = "core")]
    Core,
}

impl SourceType {
    /// All providers, in merge order
    pub const ALL: [SourceType; 3] = [SourceType::SemanticScholar, SourceType::Arxiv, SourceType::Core];

    /// Returns the display name of the source
    pub fn name(&self) -> &'static str {
        match self {
            SourceType::SemanticScholar => "Semantic Scholar",
            SourceType::Arxiv => "arXiv",
            SourceType::Core => "CORE",
        }
    }

    /// Returns the source identifier (for CLI arguments and config keys)
    pub fn id(&self) -> &'static str {
        match self {
            SourceType::SemanticScholar => "semantic",
            SourceType::Arxiv => "arxiv",
            SourceType::Core => "core",
        }
    }

    /// Look up a source by its identifier
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.id().eq_ignore_ascii_case(id.trim()))
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A research paper from any academic source
///
/// Every adapter produces this shape. Papers are never edited once built;
/// the aggregation pipeline only moves them between collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    /// Paper title, never blank
    pub title: String,

    /// Author display names in publication order
    pub authors: Vec<String>,

    /// Publication year, `None` when the provider did not report one
    pub year: Option<i32>,

    /// Abstract text
    pub r#abstract: Option<String>,

    /// Citation count (0 when unavailable)
    pub citation_count: u32,

    /// Venue name, the provider name when unavailable
    pub venue: String,

    /// Download link, DOI URL or listing URL
    pub link: Option<String>,

    /// Provider where the paper was found
    pub source: SourceType,
}

impl Paper {
    /// Authors as a single comma-separated string
    pub fn authors_display(&self) -> String {
        self.authors.join(", ")
    }

    /// Year used for ranking; unknown years rank as 0
    pub fn sort_year(&self) -> i32 {
        self.year.unwrap_or(0)
    }
}

/// Builder for constructing Paper objects
///
/// Coerces missing or malformed provider fields to their defaults.
#[derive(Debug, Clone)]
pub struct PaperBuilder {
    title: String,
    source: SourceType,
    authors: Vec<String>,
    year: Option<i32>,
    abstract_text: Option<String>,
    citation_count: u32,
    venue: Option<String>,
    link: Option<String>,
}

impl PaperBuilder {
    /// Create a new builder with required fields
    pub fn new(title: impl Into<String>, source: SourceType) -> Self {
        Self {
            title: title.into(),
            source,
            authors: Vec::new(),
            year: None,
            abstract_text: None,
            citation_count: 0,
            venue: None,
            link: None,
        }
    }

    /// Set authors; blank names are skipped
    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = authors
            .into_iter()
            .map(Into::into)
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        self
    }

    /// Set publication year
    pub fn year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    /// Set abstract; blank text counts as absent
    pub fn abstract_text(mut self, abstract_text: Option<impl Into<String>>) -> Self {
        self.abstract_text = non_blank(abstract_text);
        self
    }

    /// Set citation count
    pub fn citations(mut self, count: Option<u32>) -> Self {
        self.citation_count = count.unwrap_or(0);
        self
    }

    /// Set venue; blank text falls back to the provider name
    pub fn venue(mut self, venue: Option<impl Into<String>>) -> Self {
        self.venue = non_blank(venue);
        self
    }

    /// Set link
    pub fn link(mut self, link: Option<impl Into<String>>) -> Self {
        self.link = non_blank(link);
        self
    }

    /// Build the Paper, or `None` when the title is blank
    pub fn build(self) -> Option<Paper> {
        let title = collapse_whitespace(&self.title);
        if title.is_empty() {
            return None;
        }

        let authors = if self.authors.is_empty() {
            vec![UNKNOWN_AUTHOR.to_string()]
        } else {
            self.authors
        };

        Some(Paper {
            title,
            authors,
            year: self.year,
            r#abstract: self.abstract_text,
            citation_count: self.citation_count,
            venue: self.venue.unwrap_or_else(|| self.source.name().to_string()),
            link: self.link,
            source: self.source,
        })
    }
}

fn non_blank(value: Option<impl Into<String>>) -> Option<String> {
    value
        .map(Into::into)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Collapse runs of whitespace (including newlines) into single spaces
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
