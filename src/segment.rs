//! Section segmentation.
//!
//! Folds a document's block sequence into titled sections. The running
//! title starts as [`DEFAULT_SECTION_TITLE`]; every heading closes the
//! running section (if it has any body text) and becomes the next title.

use serde::{Deserialize, Serialize};

use crate::classify::{FontHeuristic, HeadingClassifier, SpanFeatures};
use crate::extract::{Block, ExtractedDocument};

/// Title given to body text that no heading precedes.
pub const DEFAULT_SECTION_TITLE: &str = "Introduction";

/// A titled run of body text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Document identifier
    pub document: String,
    /// Page counter at the time the section was closed
    pub page_number: u32,
    pub title: String,
    /// Trimmed body text, one block per line
    pub content: String,
    /// Position in the pooled section sequence
    pub index: usize,
}

/// Splits block sequences into sections using a heading classifier.
#[derive(Debug, Clone, Default)]
pub struct Segmenter<C: HeadingClassifier = FontHeuristic> {
    classifier: C,
}

impl Segmenter<FontHeuristic> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: HeadingClassifier> Segmenter<C> {
    /// Use a custom heading classifier.
    pub fn with_classifier(classifier: C) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Segment one document's blocks. Section indices restart at zero.
    pub fn segment(&self, blocks: &[Block]) -> Vec<Section> {
        let state = blocks
            .iter()
            .fold(SegmentState::default(), |state, block| self.step(state, block));
        state.finish()
    }

    /// Flatten and segment an extracted document.
    pub fn segment_document(
        &self,
        doc: &ExtractedDocument,
        fallback_base_size: f32,
    ) -> Vec<Section> {
        let sections = self.segment(&doc.blocks(fallback_base_size));
        log::debug!("{}: {} sections", doc.name, sections.len());
        sections
    }

    fn step(&self, mut state: SegmentState, block: &Block) -> SegmentState {
        state.document.clone_from(&block.document);
        state.page_number = block.page_number;

        let features = SpanFeatures::of(&block.lead);
        if self
            .classifier
            .classify(&features, block.base_font_size)
            .is_heading()
        {
            state.flush();
            state.title = block.text.trim().to_string();
        } else {
            state.body.push_str(&block.text);
            state.body.push('\n');
        }
        state
    }
}

/// Accumulator carried through the fold.
#[derive(Debug)]
struct SegmentState {
    document: String,
    title: String,
    body: String,
    page_number: u32,
    sections: Vec<Section>,
}

impl Default for SegmentState {
    fn default() -> Self {
        Self {
            document: String::new(),
            title: DEFAULT_SECTION_TITLE.to_string(),
            body: String::new(),
            page_number: 1,
            sections: Vec::new(),
        }
    }
}

impl SegmentState {
    /// Close the running section if it carries any text; reset the body.
    fn flush(&mut self) {
        let body = std::mem::take(&mut self.body);
        let content = body.trim();
        if content.is_empty() {
            return;
        }

        self.sections.push(Section {
            document: self.document.clone(),
            page_number: self.page_number,
            title: self.title.clone(),
            content: content.to_string(),
            index: self.sections.len(),
        });
    }

    fn finish(mut self) -> Vec<Section> {
        self.flush();
        self.sections
    }
}

/// Concatenate per-document sections into one pool, renumbering indices in
/// pooling order.
pub fn pool_sections(per_document: impl IntoIterator<Item = Vec<Section>>) -> Vec<Section> {
    let mut pooled: Vec<Section> = per_document.into_iter().flatten().collect();
    for (index, section) in pooled.iter_mut().enumerate() {
        section.index = index;
    }
    pooled
}
