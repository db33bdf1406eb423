//! Deduplication utilities for papers across sources.

use std::collections::HashSet;

use crate::models::Paper;

/// Comparison key for a title: lowercased, with every character that is
/// neither alphanumeric nor whitespace removed
pub fn title_key(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Check if two papers are duplicates
pub fn are_duplicates(a: &Paper, b: &Paper) -> bool {
    title_key(&a.title) == title_key(&b.title)
}

/// Remove duplicate papers from a list
///
/// The first occurrence of each title key is kept, so the result depends on
/// input order. Callers that want reproducible output must concatenate
/// sources in a fixed order.
pub fn deduplicate_papers(papers: Vec<Paper>) -> Vec<Paper> {
    let original_count = papers.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(papers.len());

    let unique: Vec<Paper> = papers
        .into_iter()
        .filter(|paper| seen.insert(title_key(&paper.title)))
        .collect();

    if unique.len() < original_count {
        tracing::debug!(
            "Deduplicated {} papers to {} unique papers",
            original_count,
            unique.len()
        );
    }

    unique
}
