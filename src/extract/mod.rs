//! Text-span extraction.
//!
//! A [`DocumentSource`] turns one document into pages of text blocks, each
//! block made of lines of styled spans. The segmenter only ever sees the
//! flattened [`Block`] sequence produced by [`ExtractedDocument::blocks`].

mod pdf;

pub use pdf::PdfSource;

use std::path::Path;

use crate::classify::FontStatistics;
use crate::error::Result;

/// A text span with position and style information.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline)
    pub y: f32,
    /// Font size in points
    pub font_size: f32,
    /// Font name (e.g., "Helvetica-Bold")
    pub font_name: String,
    /// Whether the font appears to be bold
    pub is_bold: bool,
}

impl TextSpan {
    /// Create a new text span. Boldness is derived from the font name.
    pub fn new(
        text: impl Into<String>,
        x: f32,
        y: f32,
        font_size: f32,
        font_name: impl Into<String>,
    ) -> Self {
        let font_name = font_name.into();
        let lower = font_name.to_lowercase();
        let is_bold = lower.contains("bold") || lower.contains("black") || lower.contains("heavy");

        Self {
            text: text.into(),
            x,
            y,
            font_size,
            font_name,
            is_bold,
        }
    }

    /// Create an unpositioned span, mostly useful for building documents in memory.
    pub fn styled(text: impl Into<String>, font_size: f32, font_name: impl Into<String>) -> Self {
        Self::new(text, 0.0, 0.0, font_size, font_name)
    }
}

/// A text line composed of spans on the same baseline, sorted left to right.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLine {
    pub spans: Vec<TextSpan>,
}

impl TextLine {
    pub fn new(spans: Vec<TextSpan>) -> Self {
        Self { spans }
    }

    /// Baseline of the line (baseline of its first span).
    pub fn y(&self) -> f32 {
        self.spans.first().map(|s| s.y).unwrap_or(0.0)
    }

    /// Left edge of the line.
    pub fn x(&self) -> f32 {
        self.spans.first().map(|s| s.x).unwrap_or(0.0)
    }
}

/// A layout block: one or more lines the extractor treats as a unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
}

impl TextBlock {
    pub fn new(lines: Vec<TextLine>) -> Self {
        Self { lines }
    }

    /// Build a single-line block from spans.
    pub fn from_spans(spans: Vec<TextSpan>) -> Self {
        Self::new(vec![TextLine::new(spans)])
    }

    /// The first span of the block, which drives heading classification.
    pub fn first_span(&self) -> Option<&TextSpan> {
        self.lines.iter().flat_map(|l| l.spans.iter()).next()
    }

    /// All spans of all lines joined by single spaces.
    pub fn text(&self) -> String {
        self.spans().map(|s| s.text.as_str()).collect::<Vec<_>>().join(" ")
    }

    /// Iterate over every span in reading order.
    pub fn spans(&self) -> impl Iterator<Item = &TextSpan> {
        self.lines.iter().flat_map(|l| l.spans.iter())
    }
}

/// One page of extracted blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    /// Page number (1-indexed)
    pub number: u32,
    pub blocks: Vec<TextBlock>,
}

impl PageLayout {
    pub fn new(number: u32, blocks: Vec<TextBlock>) -> Self {
        Self { number, blocks }
    }

    /// Most frequent span size on the page, or `fallback` when the page has no spans.
    pub fn base_font_size(&self, fallback: f32) -> f32 {
        let mut stats = FontStatistics::default();
        for span in self.blocks.iter().flat_map(|b| b.spans()) {
            stats.add_size(span.font_size);
        }
        stats.body_size().unwrap_or(fallback)
    }
}

/// A whole document as returned by a [`DocumentSource`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedDocument {
    /// Document identifier (file base name)
    pub name: String,
    pub pages: Vec<PageLayout>,
}

impl ExtractedDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pages: Vec::new(),
        }
    }

    /// Add a page.
    pub fn add_page(&mut self, page: PageLayout) {
        self.pages.push(page);
    }

    /// Builder-style variant of [`add_page`](Self::add_page).
    pub fn with_page(mut self, page: PageLayout) -> Self {
        self.add_page(page);
        self
    }

    /// Flatten the document into the ordered block sequence the segmenter
    /// consumes. Blocks without any span are skipped.
    pub fn blocks(&self, fallback_base_size: f32) -> Vec<Block> {
        let mut blocks = Vec::new();

        for page in &self.pages {
            let base_font_size = page.base_font_size(fallback_base_size);

            for block in &page.blocks {
                let Some(lead) = block.first_span() else {
                    continue;
                };
                blocks.push(Block {
                    document: self.name.clone(),
                    page_number: page.number,
                    text: block.text(),
                    lead: lead.clone(),
                    base_font_size,
                    ordinal: blocks.len(),
                });
            }
        }

        blocks
    }
}

/// A block as seen by the segmenter.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Owning document identifier
    pub document: String,
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Text of all spans joined by spaces
    pub text: String,
    /// First span of the block; its size and weight classify the block
    pub lead: TextSpan,
    /// Dominant font size of the block's page
    pub base_font_size: f32,
    /// Position within the document
    pub ordinal: usize,
}

/// A source of extracted documents.
pub trait DocumentSource: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Extract one document. Unreadable documents return an error; the
    /// caller decides whether to skip or abort.
    fn extract(&self, path: &Path) -> Result<ExtractedDocument>;
}

/// Base name of a path, as used for document identifiers.
pub fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
