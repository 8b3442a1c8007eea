//! # sectionrank
//!
//! Persona-driven section ranking for PDF collections.
//!
//! Each document is split into titled sections by font heuristics, every
//! section title is scored against a "persona + task" query with a text
//! embedding model, and the best sections are condensed to their most
//! relevant sentences.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sectionrank::{analyze_files, report, HashingEmbedder, Query};
//!
//! fn main() -> sectionrank::Result<()> {
//!     let query = Query::new("Travel Planner", "Plan a trip of 4 days for 10 friends")?;
//!     let result = analyze_files(&["guide.pdf"], &query, HashingEmbedder::default())?;
//!
//!     println!("{}", report::to_json(&result, report::JsonFormat::Pretty)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Stages
//!
//! - **Extraction**: PDF content streams to styled spans, lines and blocks
//! - **Segmentation**: headings detected from font size and weight
//! - **Ranking**: title similarity, deduplicated by title, top 5
//! - **Refinement**: best sentences of each ranked section body

pub mod challenge;
pub mod classify;
pub mod embed;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod rank;
pub mod refine;
pub mod report;
pub mod segment;

// Re-export commonly used types
pub use challenge::{find_challenge_file, Challenge, DocumentRef, JobToBeDone, Persona};
pub use classify::{FontHeuristic, FontStatistics, HeadingClassifier, HeadingDecision, SpanFeatures};
pub use embed::{cosine_similarity, Embedder, Embedding, HashingEmbedder};
#[cfg(feature = "fastembed")]
pub use embed::{is_model_cached, MiniLmEmbedder, DEFAULT_MODEL_CACHE};
pub use error::{Error, Result};
pub use extract::{
    Block, DocumentSource, ExtractedDocument, PageLayout, PdfSource, TextBlock, TextLine, TextSpan,
};
pub use pipeline::{ErrorMode, Pipeline, PipelineConfig, Query};
pub use rank::{RankedSection, Ranker, RankerConfig};
pub use refine::{RefinedSection, Refiner, RefinerConfig};
pub use report::{AnalysisResult, JsonFormat, RunMetadata};
pub use segment::{Section, Segmenter};

use std::path::{Path, PathBuf};

use classify::FALLBACK_BASE_FONT_SIZE;

/// Rank the sections of a set of PDF files with default settings.
///
/// # Arguments
///
/// * `paths` - PDF files, in pooling order
/// * `query` - Persona and task to rank for
/// * `embedder` - Embedding backend
///
/// # Example
///
/// ```no_run
/// use sectionrank::{analyze_files, HashingEmbedder, Query};
///
/// let query = Query::new("HR professional", "Create fillable onboarding forms").unwrap();
/// let result = analyze_files(&["forms.pdf"], &query, HashingEmbedder::default()).unwrap();
/// println!("{} sections", result.extracted_sections.len());
/// ```
pub fn analyze_files<P, E>(paths: &[P], query: &Query, embedder: E) -> Result<AnalysisResult>
where
    P: AsRef<Path>,
    E: Embedder,
{
    let paths: Vec<PathBuf> = paths.iter().map(|p| p.as_ref().to_path_buf()).collect();
    Pipeline::new(embedder).run(&paths, query)
}

/// Extract and segment a single PDF file.
///
/// # Example
///
/// ```no_run
/// let sections = sectionrank::segment_file("guide.pdf").unwrap();
/// for s in &sections {
///     println!("p{} {}", s.page_number, s.title);
/// }
/// ```
pub fn segment_file<P: AsRef<Path>>(path: P) -> Result<Vec<Section>> {
    let doc = PdfSource::new().extract(path.as_ref())?;
    Ok(Segmenter::new().segment_document(&doc, FALLBACK_BASE_FONT_SIZE))
}

/// Extract and segment a PDF held in memory.
///
/// `name` becomes the document identifier of every section.
pub fn segment_bytes(name: &str, data: &[u8]) -> Result<Vec<Section>> {
    let doc = PdfSource::new().extract_bytes(name, data)?;
    Ok(Segmenter::new().segment_document(&doc, FALLBACK_BASE_FONT_SIZE))
}
