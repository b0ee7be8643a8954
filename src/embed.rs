//! The embedding capability consumed by similarity-guided chunking.
//!
//! strata never computes embeddings itself. A caller plugs in any backend
//! (a local model, an HTTP client, a cache in front of either) by
//! implementing [`Embedder`]. Latency, batching and retries are the
//! backend's concern.

use crate::Result;

/// Turns text into vectors and compares them.
pub trait Embedder: Send + Sync {
    /// Embed one piece of text.
    ///
    /// # Errors
    ///
    /// Backend failures, reported as [`Error::Embedding`](crate::Error::Embedding).
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, in order.
    ///
    /// # Errors
    ///
    /// Fails if any single embedding fails.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Similarity of two embeddings; cosine by default.
    fn cosine_similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        cosine_similarity(a, b)
    }
}

/// Cosine similarity; zero when either vector has zero norm.
///
/// ```rust
/// use strata::cosine_similarity;
///
/// assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
/// assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a > 0.0 && norm_b > 0.0 {
        dot / (norm_a * norm_b)
    } else {
        0.0
    }
}

/// Local ONNX embeddings via fastembed (BGE-small-en by default).
#[cfg(feature = "fastembed")]
pub struct FastEmbedder {
    model: fastembed::TextEmbedding,
}

#[cfg(feature = "fastembed")]
impl FastEmbedder {
    /// Load the default fastembed model.
    ///
    /// # Errors
    ///
    /// Returns an error if the model fails to load.
    pub fn new() -> Result<Self> {
        let model = fastembed::TextEmbedding::try_new(fastembed::InitOptions::default())
            .map_err(|e| crate::Error::Embedding(e.to_string()))?;
        Ok(Self { model })
    }
}

#[cfg(feature = "fastembed")]
impl Embedder for FastEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| crate::Error::Embedding("empty embedding batch".into()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.model
            .embed(texts.to_vec(), None)
            .map_err(|e| crate::Error::Embedding(e.to_string()))
    }
}

#[cfg(feature = "fastembed")]
impl std::fmt::Debug for FastEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedder").finish_non_exhaustive()
    }
}
