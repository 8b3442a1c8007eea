//! Text embedding.
//!
//! The ranker and refiner only talk to the [`Embedder`] trait; the model is
//! constructed once by the caller and passed in.
//!
//! # Backends
//!
//! - [`HashingEmbedder`]: deterministic feature hashing, always available
//! - `MiniLmEmbedder` (feature `fastembed`): `all-MiniLM-L6-v2`, 384 dimensions
//!
//! # Usage
//!
//! ```
//! use sectionrank::embed::{cosine_similarity, Embedder, HashingEmbedder};
//!
//! let embedder = HashingEmbedder::default();
//! let query = embedder.embed("plan a trip with friends").unwrap();
//! let texts = embedder.embed_batch(&["trip planning", "tax law"]).unwrap();
//! assert!(cosine_similarity(&query, &texts[0]) > cosine_similarity(&query, &texts[1]));
//! ```

mod hashing;
#[cfg(feature = "fastembed")]
mod minilm;

pub use hashing::HashingEmbedder;
#[cfg(feature = "fastembed")]
pub use minilm::{is_model_cached, MiniLmEmbedder, DEFAULT_MODEL_CACHE};

use crate::error::{Error, Result};

/// A vector embedding.
pub type Embedding = Vec<f32>;

/// Maps text to fixed-length vectors. Implementations must be deterministic
/// for fixed inputs and weights.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Embedding> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("model returned no embeddings".to_string()))
    }

    /// Returns the embedding dimension
    fn dimension(&self) -> usize;

    /// Returns the model name/identifier
    fn model_name(&self) -> &str;
}

impl<E: Embedder + ?Sized> Embedder for &E {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        (**self).embed_batch(texts)
    }

    fn embed(&self, text: &str) -> Result<Embedding> {
        (**self).embed(text)
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        (**self).embed_batch(texts)
    }

    fn embed(&self, text: &str) -> Result<Embedding> {
        (**self).embed(text)
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Embed a batch and check that the backend returned one vector per text.
pub fn embed_checked<E: Embedder + ?Sized>(
    embedder: &E,
    texts: &[&str],
) -> Result<Vec<Embedding>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let vectors = embedder.embed_batch(texts)?;
    if vectors.len() != texts.len() {
        return Err(Error::Embedding(format!(
            "{} returned {} vectors for {} texts",
            embedder.model_name(),
            vectors.len(),
            texts.len()
        )));
    }
    Ok(vectors)
}

/// Cosine similarity in `[-1, 1]`. Zero-norm, mismatched or non-finite
/// vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let similarity = dot / (norm_a * norm_b);
    if similarity.is_nan() {
        return 0.0;
    }
    similarity.clamp(-1.0, 1.0)
}
