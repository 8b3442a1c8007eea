use std::path::{Path, PathBuf};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::embed::{Embedder, Embedding};
use crate::error::{Error, Result};

/// fastembed's default cache directory.
pub const DEFAULT_MODEL_CACHE: &str = ".fastembed_cache";

/// Hub cache entry holding the ONNX export of the model.
const MODEL_CACHE_ENTRY: &str = "models--Qdrant--all-MiniLM-L6-v2-onnx";

/// Sentence embedder using `sentence-transformers/all-MiniLM-L6-v2`.
///
/// Runs on CPU through fastembed's ONNX runtime and produces 384-dimensional
/// vectors. Queries and passages share one encoder, so no prompt prefix is
/// applied.
///
/// Loading never touches the network: [`from_cache`](Self::from_cache)
/// fails when the weights are not already in the cache directory. Use
/// [`download`](Self::download) to provision a cache ahead of time.
pub struct MiniLmEmbedder {
    model: TextEmbedding,
}

impl MiniLmEmbedder {
    /// Load the model from weights already present in `cache_dir`.
    pub fn from_cache(cache_dir: impl AsRef<Path>) -> Result<Self> {
        let cache_dir = cache_dir.as_ref();
        if !is_model_cached(cache_dir) {
            return Err(Error::Embedding(format!(
                "all-MiniLM-L6-v2 not found in {}",
                cache_dir.display()
            )));
        }
        Self::load(cache_dir.to_path_buf(), false)
    }

    /// Download the model into `cache_dir` (if missing) and load it.
    pub fn download(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::load(cache_dir.into(), true)
    }

    fn load(cache_dir: PathBuf, show_progress: bool) -> Result<Self> {
        let opts = InitOptions::new(EmbeddingModel::AllMiniLML6V2)
            .with_cache_dir(cache_dir)
            .with_show_download_progress(show_progress);
        TextEmbedding::try_new(opts)
            .map(|model| Self { model })
            .map_err(|e| Error::Embedding(e.to_string()))
    }
}

/// Whether `cache_dir` holds a downloaded copy of the model.
pub fn is_model_cached(cache_dir: &Path) -> bool {
    cache_dir.join(MODEL_CACHE_ENTRY).is_dir()
}

impl Embedder for MiniLmEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        self.model
            .embed(texts.to_vec(), None)
            .map_err(|e| Error::Embedding(e.to_string()))
    }

    fn dimension(&self) -> usize {
        384
    }

    fn model_name(&self) -> &str {
        "sentence-transformers/all-MiniLM-L6-v2"
    }
}
