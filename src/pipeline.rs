//! End-to-end orchestration: extract, segment, pool, rank, refine.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rayon::prelude::*;

use crate::challenge::Challenge;
use crate::classify::{FontHeuristic, HeadingClassifier, FALLBACK_BASE_FONT_SIZE};
use crate::embed::Embedder;
use crate::error::{Error, Result};
use crate::extract::{document_name, DocumentSource, ExtractedDocument, PdfSource};
use crate::rank::{Ranker, RankerConfig};
use crate::refine::{Refiner, RefinerConfig};
use crate::report::{AnalysisResult, RunMetadata};
use crate::segment::{pool_sections, Segmenter};

/// Persona and task the corpus is ranked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    persona: String,
    task: String,
}

impl Query {
    /// Build a query. Fails when both persona and task are blank.
    pub fn new(persona: impl Into<String>, task: impl Into<String>) -> Result<Self> {
        let persona = persona.into();
        let task = task.into();
        if persona.trim().is_empty() && task.trim().is_empty() {
            return Err(Error::InvalidQuery(
                "persona and task are both empty".to_string(),
            ));
        }
        Ok(Self { persona, task })
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    /// The string that gets embedded as the query vector.
    pub fn text(&self) -> String {
        format!("Role: {}. Task: {}", self.persona, self.task)
    }
}

/// How unreadable documents are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Abort the run on the first unreadable document
    Strict,
    /// Skip unreadable documents and continue
    #[default]
    Lenient,
}

/// Options for a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub ranker: RankerConfig,

    pub refiner: RefinerConfig,

    /// Error handling mode for document extraction
    pub error_mode: ErrorMode,

    /// Whether to extract documents concurrently
    pub parallel: bool,

    /// Base font size for pages without any spans
    pub fallback_base_size: f32,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.ranker.top_k = top_k;
        self
    }

    pub fn with_max_sentences(mut self, max_sentences: usize) -> Self {
        self.refiner.max_sentences = max_sentences;
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.refiner.min_score = min_score;
        self
    }

    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Abort on the first unreadable document.
    pub fn strict(mut self) -> Self {
        self.error_mode = ErrorMode::Strict;
        self
    }

    /// Extract documents one at a time.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn with_fallback_base_size(mut self, size: f32) -> Self {
        self.fallback_base_size = size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.ranker.validate()?;
        self.refiner.validate()?;
        if !(self.fallback_base_size.is_finite() && self.fallback_base_size > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "fallback_base_size {} must be a positive number",
                self.fallback_base_size
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ranker: RankerConfig::default(),
            refiner: RefinerConfig::default(),
            error_mode: ErrorMode::Lenient,
            parallel: true,
            fallback_base_size: FALLBACK_BASE_FONT_SIZE,
        }
    }
}

/// The section ranking pipeline.
///
/// # Example
///
/// ```no_run
/// use std::path::PathBuf;
/// use sectionrank::{HashingEmbedder, Pipeline, Query};
///
/// let pipeline = Pipeline::new(HashingEmbedder::default());
/// let query = Query::new("Travel Planner", "Plan a 4 day trip").unwrap();
/// let result = pipeline
///     .run(&[PathBuf::from("guide.pdf")], &query)
///     .unwrap();
/// for section in &result.extracted_sections {
///     println!("{} {}", section.importance_rank, section.section_title);
/// }
/// ```
pub struct Pipeline<E, S = PdfSource, C: HeadingClassifier = FontHeuristic> {
    embedder: E,
    source: S,
    segmenter: Segmenter<C>,
    config: PipelineConfig,
}

impl<E: Embedder> Pipeline<E> {
    /// A pipeline reading PDFs with the font-size heading heuristic.
    pub fn new(embedder: E) -> Self {
        Self {
            embedder,
            source: PdfSource::new(),
            segmenter: Segmenter::new(),
            config: PipelineConfig::default(),
        }
    }
}

impl<E, S, C> Pipeline<E, S, C>
where
    E: Embedder,
    S: DocumentSource,
    C: HeadingClassifier,
{
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Read documents through a different source.
    pub fn with_source<S2: DocumentSource>(self, source: S2) -> Pipeline<E, S2, C> {
        Pipeline {
            embedder: self.embedder,
            source,
            segmenter: self.segmenter,
            config: self.config,
        }
    }

    /// Classify headings with a different heuristic.
    pub fn with_classifier<C2: HeadingClassifier>(self, classifier: C2) -> Pipeline<E, S, C2> {
        Pipeline {
            embedder: self.embedder,
            source: self.source,
            segmenter: Segmenter::with_classifier(classifier),
            config: self.config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Run the whole pipeline over `paths`.
    pub fn run(&self, paths: &[PathBuf], query: &Query) -> Result<AnalysisResult> {
        self.run_with_progress(paths, query, |_| {})
    }

    /// Like [`run`](Self::run), calling `on_extracted` once per document
    /// after its extraction finishes (successfully or not).
    pub fn run_with_progress<F>(
        &self,
        paths: &[PathBuf],
        query: &Query,
        on_extracted: F,
    ) -> Result<AnalysisResult>
    where
        F: Fn(&Path) + Sync,
    {
        self.config.validate()?;

        let documents = self.extract_all_with(paths, on_extracted)?;
        let names = paths.iter().map(|p| document_name(p)).collect();
        self.analyze(names, &documents, query)
    }

    /// Run over the documents a challenge lists, resolved against `base_dir`.
    pub fn run_challenge(&self, challenge: &Challenge, base_dir: &Path) -> Result<AnalysisResult> {
        let query = challenge.query()?;
        self.run(&challenge.document_paths(base_dir), &query)
    }

    /// Extract every document, applying the configured error mode.
    pub fn extract_all(&self, paths: &[PathBuf]) -> Result<Vec<ExtractedDocument>> {
        self.extract_all_with(paths, |_| {})
    }

    fn extract_all_with<F>(
        &self,
        paths: &[PathBuf],
        on_extracted: F,
    ) -> Result<Vec<ExtractedDocument>>
    where
        F: Fn(&Path) + Sync,
    {
        let extract_one = |path: &PathBuf| {
            log::debug!("{}: extracting {}", self.source.name(), path.display());
            let result = self.source.extract(path);
            on_extracted(path);
            result
        };

        let results: Vec<Result<ExtractedDocument>> = if self.config.parallel {
            paths.par_iter().map(extract_one).collect()
        } else {
            paths.iter().map(extract_one).collect()
        };

        let mut documents = Vec::with_capacity(results.len());
        let mut failed = 0;

        for (path, result) in paths.iter().zip(results) {
            match result {
                Ok(doc) => documents.push(doc),
                Err(e) if self.config.error_mode == ErrorMode::Lenient && e.is_document_error() => {
                    log::warn!("{}: skipping {}: {}", self.source.name(), path.display(), e);
                    failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        if !paths.is_empty() && documents.is_empty() {
            return Err(Error::NoReadableDocuments(failed));
        }

        log::info!("extracted {} of {} documents", documents.len(), paths.len());
        Ok(documents)
    }

    /// Segment, rank and refine already extracted documents.
    ///
    /// `input_documents` is echoed into the metadata as is.
    pub fn analyze(
        &self,
        input_documents: Vec<String>,
        documents: &[ExtractedDocument],
        query: &Query,
    ) -> Result<AnalysisResult> {
        let metadata = RunMetadata::new(input_documents, query.persona(), query.task(), Utc::now());

        let sections = pool_sections(
            documents
                .iter()
                .map(|doc| self.segmenter.segment_document(doc, self.config.fallback_base_size)),
        );
        log::info!("pooled {} sections", sections.len());

        if sections.is_empty() {
            return Ok(AnalysisResult::empty(metadata));
        }

        let query_vector = self.embedder.embed(&query.text())?;

        let ranked =
            Ranker::new(self.config.ranker).rank(&sections, &query_vector, &self.embedder)?;
        let refined = Refiner::new(self.config.refiner).refine_all(
            &ranked,
            &sections,
            &query_vector,
            &self.embedder,
        )?;
        log::info!("{} sections ranked, {} refined", ranked.len(), refined.len());

        Ok(AnalysisResult {
            metadata,
            extracted_sections: ranked,
            subsection_analysis: refined,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashingEmbedder;
    use crate::extract::{PageLayout, TextBlock, TextSpan};

    /// Serves documents by file name; any other name is corrupt.
    struct FixtureSource;

    impl DocumentSource for FixtureSource {
        fn name(&self) -> &str {
            "fixture"
        }

        fn extract(&self, path: &Path) -> Result<ExtractedDocument> {
            match document_name(path).as_str() {
                "fox.pdf" => Ok(ExtractedDocument::new("fox.pdf").with_page(PageLayout::new(
                    1,
                    vec![TextBlock::from_spans(vec![TextSpan::styled(
                        "The quick fox jumps. It runs fast.",
                        10.0,
                        "Helvetica",
                    )])],
                ))),
                "blank.pdf" => Ok(ExtractedDocument::new("blank.pdf")),
                other => Err(Error::Corrupted(format!("{} is damaged", other))),
            }
        }
    }

    fn pipeline() -> Pipeline<HashingEmbedder, FixtureSource> {
        Pipeline::new(HashingEmbedder::default()).with_source(FixtureSource)
    }

    fn query() -> Query {
        Query::new("Zoologist", "Study animal behaviour").unwrap()
    }

    #[test]
    fn test_query_text() {
        assert_eq!(
            query().text(),
            "Role: Zoologist. Task: Study animal behaviour"
        );
        assert!(Query::new("", "task only").is_ok());
        assert!(matches!(Query::new(" ", "\t"), Err(Error::InvalidQuery(_))));
    }

    #[test]
    fn test_config_builder() {
        let config = PipelineConfig::new()
            .with_top_k(3)
            .with_max_sentences(2)
            .with_min_score(0.2)
            .strict()
            .sequential();

        assert_eq!(config.ranker.top_k, 3);
        assert_eq!(config.refiner.max_sentences, 2);
        assert_eq!(config.refiner.min_score, 0.2);
        assert_eq!(config.error_mode, ErrorMode::Strict);
        assert!(!config.parallel);
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.error_mode, ErrorMode::Lenient);
        assert!(config.parallel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config_rejected_before_extraction() {
        let pipeline = pipeline().with_config(PipelineConfig::new().with_top_k(0));
        let err = pipeline.run(&[PathBuf::from("fox.pdf")], &query()).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let bad_fallback = PipelineConfig::new().with_fallback_base_size(0.0);
        assert!(bad_fallback.validate().is_err());
    }

    #[test]
    fn test_lenient_skips_bad_document() {
        let paths = vec![PathBuf::from("in/bad.pdf"), PathBuf::from("in/fox.pdf")];
        let result = pipeline().run(&paths, &query()).unwrap();

        assert_eq!(result.metadata.input_documents, vec!["bad.pdf", "fox.pdf"]);
        assert_eq!(result.extracted_sections.len(), 1);
        assert_eq!(result.extracted_sections[0].document, "fox.pdf");
    }

    #[test]
    fn test_strict_aborts_on_bad_document() {
        let pipeline = pipeline().with_config(PipelineConfig::new().strict());
        let paths = vec![PathBuf::from("fox.pdf"), PathBuf::from("bad.pdf")];
        let err = pipeline.run(&paths, &query()).unwrap_err();
        assert!(matches!(err, Error::Corrupted(_)));
    }

    #[test]
    fn test_all_documents_unreadable() {
        let paths = vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")];
        let err = pipeline().run(&paths, &query()).unwrap_err();
        assert!(matches!(err, Error::NoReadableDocuments(2)));
    }

    #[test]
    fn test_empty_corpus() {
        let result = pipeline().run(&[], &query()).unwrap();
        assert!(result.extracted_sections.is_empty());
        assert!(result.subsection_analysis.is_empty());
        assert!(result.metadata.input_documents.is_empty());
    }

    #[test]
    fn test_document_without_text_contributes_nothing() {
        let result = pipeline().run(&[PathBuf::from("blank.pdf")], &query()).unwrap();
        assert!(result.extracted_sections.is_empty());
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let paths = vec![PathBuf::from("fox.pdf"), PathBuf::from("blank.pdf")];
        let parallel = pipeline().run(&paths, &query()).unwrap();
        let sequential = pipeline()
            .with_config(PipelineConfig::new().sequential())
            .run(&paths, &query())
            .unwrap();

        assert_eq!(parallel.extracted_sections, sequential.extracted_sections);
        assert_eq!(parallel.subsection_analysis, sequential.subsection_analysis);
    }

    #[test]
    fn test_progress_called_per_document() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let seen = AtomicUsize::new(0);
        let paths = vec![PathBuf::from("fox.pdf"), PathBuf::from("bad.pdf")];
        pipeline()
            .run_with_progress(&paths, &query(), |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
