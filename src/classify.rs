//! Heading classification from span style.
//!
//! The segmenter asks a [`HeadingClassifier`] about the first span of every
//! block. The default [`FontHeuristic`] compares the span with the page's
//! body ("base") font size:
//!
//! ```text
//! heading = size > base && (bold || (words < 12 && !ends_with('.')))
//! ```

use crate::extract::TextSpan;

/// Base size used for a page that has no spans at all.
pub const FALLBACK_BASE_FONT_SIZE: f32 = 10.0;

/// Word count below which an enlarged span counts as a heading even when
/// it is not bold.
pub const MAX_HEADING_WORDS: usize = 12;

/// Font size statistics for a page.
///
/// Sizes are compared exactly and counted in first-seen order, so the body
/// size is always a size that actually occurs and ties resolve to the size
/// seen first.
#[derive(Debug, Clone, Default)]
pub struct FontStatistics {
    sizes: Vec<(f32, usize)>,
}

impl FontStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a font size observation.
    pub fn add_size(&mut self, size: f32) {
        match self.sizes.iter_mut().find(|(s, _)| *s == size) {
            Some((_, count)) => *count += 1,
            None => self.sizes.push((size, 1)),
        }
    }

    /// Most common font size, `None` if nothing was observed.
    pub fn body_size(&self) -> Option<f32> {
        let mut best: Option<(f32, usize)> = None;
        for &(size, count) in &self.sizes {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((size, count));
            }
        }
        best.map(|(size, _)| size)
    }

    /// Number of distinct sizes observed.
    pub fn distinct_sizes(&self) -> usize {
        self.sizes.len()
    }
}

/// Style features of a span that heading heuristics look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpanFeatures {
    pub font_size: f32,
    pub is_bold: bool,
    pub word_count: usize,
    pub ends_with_period: bool,
}

impl SpanFeatures {
    pub fn of(span: &TextSpan) -> Self {
        Self {
            font_size: span.font_size,
            is_bold: span.is_bold,
            word_count: span.text.split_whitespace().count(),
            ends_with_period: span.text.trim().ends_with('.'),
        }
    }
}

/// Outcome of classifying a block's first span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingDecision {
    Heading,
    Body,
}

impl HeadingDecision {
    pub fn is_heading(self) -> bool {
        self == HeadingDecision::Heading
    }
}

/// Decides whether a span opens a new section.
pub trait HeadingClassifier: Send + Sync {
    fn classify(&self, span: &SpanFeatures, base_font_size: f32) -> HeadingDecision;
}

/// Font-size and weight heuristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontHeuristic {
    /// Non-bold spans need fewer words than this to count as headings
    pub max_heading_words: usize,
}

impl FontHeuristic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the word limit for short, unstyled headings.
    pub fn with_max_heading_words(mut self, words: usize) -> Self {
        self.max_heading_words = words;
        self
    }
}

impl Default for FontHeuristic {
    fn default() -> Self {
        Self {
            max_heading_words: MAX_HEADING_WORDS,
        }
    }
}

impl HeadingClassifier for FontHeuristic {
    fn classify(&self, span: &SpanFeatures, base_font_size: f32) -> HeadingDecision {
        let is_larger = span.font_size > base_font_size;
        let short_and_clean = span.word_count < self.max_heading_words && !span.ends_with_period;

        if is_larger && (span.is_bold || short_and_clean) {
            HeadingDecision::Heading
        } else {
            HeadingDecision::Body
        }
    }
}
