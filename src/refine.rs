//! Sentence-level refinement of ranked sections.
//!
//! A section body is flattened to one line, split into sentences, and each
//! sentence is scored against the query vector. Sentences at or below the
//! relevance floor are dropped; the best remaining ones are joined in score
//! order.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::embed::{cosine_similarity, embed_checked, Embedder};
use crate::error::{Error, Result};
use crate::rank::RankedSection;
use crate::segment::Section;

/// Sentences kept per refined section by default.
pub const DEFAULT_MAX_SENTENCES: usize = 5;

/// Sentences scoring at or below this similarity are discarded.
pub const DEFAULT_MIN_SCORE: f32 = 0.1;

/// Bullet glyphs that survive PDF extraction as stray characters.
const BULLET_GLYPHS: [char; 2] = ['\u{2022}', '\u{f0b7}'];

/// Refiner configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefinerConfig {
    /// Maximum sentences in a refined text
    pub max_sentences: usize,
    /// Exclusive similarity floor
    pub min_score: f32,
}

impl RefinerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_sentences(mut self, max_sentences: usize) -> Self {
        self.max_sentences = max_sentences;
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_sentences == 0 {
            return Err(Error::InvalidConfig(
                "max_sentences must be at least 1".to_string(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.min_score) {
            return Err(Error::InvalidConfig(format!(
                "min_score {} is outside [-1, 1]",
                self.min_score
            )));
        }
        Ok(())
    }
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            max_sentences: DEFAULT_MAX_SENTENCES,
            min_score: DEFAULT_MIN_SCORE,
        }
    }
}

/// Refined text for one ranked section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinedSection {
    pub document: String,
    pub refined_text: String,
    pub page_number: u32,
}

/// Picks the most query-relevant sentences of a section body.
#[derive(Debug, Clone, Default)]
pub struct Refiner {
    config: RefinerConfig,
}

impl Refiner {
    pub fn new(config: RefinerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RefinerConfig {
        &self.config
    }

    /// Refine one body. Returns an empty string when no sentence clears the
    /// floor.
    pub fn refine<E: Embedder + ?Sized>(
        &self,
        content: &str,
        query: &[f32],
        embedder: &E,
    ) -> Result<String> {
        let cleaned = clean_text(content);
        let sentences = split_sentences(&cleaned);
        if sentences.is_empty() {
            return Ok(String::new());
        }

        let vectors = embed_checked(embedder, &sentences)?;

        let mut scored: Vec<(f32, &str)> = vectors
            .iter()
            .map(|v| cosine_similarity(query, v))
            .zip(sentences)
            .filter(|(score, _)| *score > self.config.min_score)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(self.config.max_sentences)
            .map(|(_, sentence)| sentence)
            .collect::<Vec<_>>()
            .join(" "))
    }

    /// Refine every ranked section, in rank order, dropping empty results.
    ///
    /// `sections` is the pooled sequence the ranking was computed from.
    pub fn refine_all<E: Embedder + ?Sized>(
        &self,
        ranked: &[RankedSection],
        sections: &[Section],
        query: &[f32],
        embedder: &E,
    ) -> Result<Vec<RefinedSection>> {
        let mut refined = Vec::with_capacity(ranked.len());

        for item in ranked {
            let Some(section) = sections.get(item.section_index) else {
                log::warn!(
                    "ranked section '{}' points outside the pool (index {})",
                    item.section_title,
                    item.section_index
                );
                continue;
            };

            let text = self.refine(&section.content, query, embedder)?;
            if text.is_empty() {
                log::debug!("'{}' has no sentence above the floor", item.section_title);
                continue;
            }

            refined.push(RefinedSection {
                document: item.document.clone(),
                refined_text: text,
                page_number: item.page_number,
            });
        }

        Ok(refined)
    }
}

/// Flatten newlines and bullet glyphs to spaces and collapse whitespace.
pub fn clean_text(content: &str) -> String {
    content
        .replace(&BULLET_GLYPHS[..], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn sentence_boundary() -> &'static Regex {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    BOUNDARY.get_or_init(|| {
        Regex::new(r"[.!?]\s+").expect("sentence boundary pattern is valid")
    })
}

/// Split after `.`, `!` or `?` followed by whitespace; empty fragments are
/// discarded.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in sentence_boundary().find_iter(text) {
        // Keep the terminal mark with its sentence
        let end = boundary.start() + 1;
        sentences.push(text[start..end].trim());
        start = boundary.end();
    }
    sentences.push(text[start..].trim());

    sentences.retain(|s| !s.is_empty());
    sentences
}
