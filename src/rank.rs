//! Relevance ranking of pooled sections.
//!
//! Every section title is embedded in one batch and scored against the
//! query vector. Sections are sorted by descending score (stable, so ties
//! keep pooling order) and walked once, keeping the first occurrence of each
//! title until `top_k` ranks are assigned.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::embed::{cosine_similarity, embed_checked, Embedder};
use crate::error::{Error, Result};
use crate::segment::Section;

/// Number of ranked sections reported by default.
pub const DEFAULT_TOP_K: usize = 5;

/// Ranker configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankerConfig {
    /// Maximum number of distinct-title sections to return
    pub top_k: usize,
}

impl RankerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// A section selected by the ranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSection {
    pub document: String,
    pub section_title: String,
    /// 1-based rank, 1 = most relevant
    pub importance_rank: usize,
    pub page_number: u32,
    /// Pooled index of the section this entry was taken from
    #[serde(skip)]
    pub section_index: usize,
    /// Title similarity against the query
    #[serde(skip)]
    pub score: f32,
}

/// Scores and selects sections by title relevance.
#[derive(Debug, Clone, Default)]
pub struct Ranker {
    config: RankerConfig,
}

impl Ranker {
    pub fn new(config: RankerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    /// Rank `sections` against `query`. An empty pool yields an empty list
    /// without touching the embedder.
    pub fn rank<E: Embedder + ?Sized>(
        &self,
        sections: &[Section],
        query: &[f32],
        embedder: &E,
    ) -> Result<Vec<RankedSection>> {
        if sections.is_empty() {
            return Ok(Vec::new());
        }

        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        let vectors = embed_checked(embedder, &titles)?;

        let mut scored: Vec<(f32, &Section)> = vectors
            .iter()
            .map(|v| cosine_similarity(query, v))
            .zip(sections)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut seen: HashSet<&str> = HashSet::new();
        let mut ranked = Vec::with_capacity(self.config.top_k);

        for (score, section) in scored {
            if ranked.len() >= self.config.top_k {
                break;
            }
            if !seen.insert(section.title.as_str()) {
                continue;
            }

            ranked.push(RankedSection {
                document: section.document.clone(),
                section_title: section.title.clone(),
                importance_rank: ranked.len() + 1,
                page_number: section.page_number,
                section_index: section.index,
                score,
            });
        }

        log::debug!(
            "ranked {} of {} sections (top_k = {})",
            ranked.len(),
            sections.len(),
            self.config.top_k
        );

        Ok(ranked)
    }
}
