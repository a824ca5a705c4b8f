//! Embedding Module
//!
//! Turns text into fixed-length vectors for the chunk and QA indices.
//!
//! ## Backends
//!
//! - **HttpEmbedder**: OpenAI-compatible `/embeddings` endpoint (llama.cpp
//!   server, Ollama, hosted APIs)
//! - **HashingEmbedder**: deterministic feature-hashing fallback, no network
//!
//! Every vector entering an index goes through [`normalize`], which rejects
//! NaN/Inf components and divides by `norm + 1e-10` so a zero vector stays
//! zero instead of blowing up.

use thiserror::Error;

pub mod hashing;
pub mod http;

pub use hashing::HashingEmbedder;
pub use http::{HttpEmbedder, HttpEmbedderConfig};

/// Guard added to the L2 norm before dividing.
pub const NORM_EPSILON: f64 = 1e-10;

/// Errors raised by embedding backends or vector validation.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding backend '{backend}' failed: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    #[error("embedding contains a non-finite value at dimension {0}")]
    NonFinite(usize),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding backend returned an empty vector")]
    Empty,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Text → vector capability.
///
/// Implementations must be deterministic for identical input within a process
/// lifetime. Indices share one embedder across threads, hence `Send + Sync`.
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// L2-normalize a vector with an epsilon-guarded denominator.
///
/// # Errors
///
/// Returns [`EmbeddingError::NonFinite`] if any component is NaN or infinite.
pub fn normalize(vector: &[f32]) -> Result<Vec<f32>, EmbeddingError> {
    if let Some(pos) = vector.iter().position(|v| !v.is_finite()) {
        return Err(EmbeddingError::NonFinite(pos));
    }

    let norm = vector
        .iter()
        .map(|v| f64::from(*v) * f64::from(*v))
        .sum::<f64>()
        .sqrt();
    let denom = norm + NORM_EPSILON;

    #[allow(clippy::cast_possible_truncation)]
    Ok(vector
        .iter()
        .map(|v| (f64::from(*v) / denom) as f32)
        .collect())
}

/// Dot product of two equal-length vectors (cosine similarity for unit vectors).
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Embed `text`, check its dimension when one is expected, and normalize.
pub fn embed_normalized(
    embedder: &dyn Embedder,
    text: &str,
    expected_dim: Option<usize>,
) -> Result<Vec<f32>, EmbeddingError> {
    let raw = embedder.embed(text)?;
    if raw.is_empty() {
        return Err(EmbeddingError::Empty);
    }
    if let Some(expected) = expected_dim {
        if raw.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: raw.len(),
            });
        }
    }
    normalize(&raw)
}

/// Embed and normalize a batch sequentially, enforcing one shared dimension.
///
/// Calls `progress(done, total)` after every item so callers can log.
pub fn embed_all<'a, I>(
    embedder: &dyn Embedder,
    texts: I,
    mut progress: impl FnMut(usize, usize),
) -> Result<Vec<Vec<f32>>, EmbeddingError>
where
    I: ExactSizeIterator<Item = &'a str>,
{
    let total = texts.len();
    let mut vectors = Vec::with_capacity(total);
    let mut dim: Option<usize> = None;

    for (i, text) in texts.enumerate() {
        let v = embed_normalized(embedder, text, dim)?;
        if dim.is_none() {
            dim = Some(v.len());
        }
        vectors.push(v);
        progress(i + 1, total);
    }

    Ok(vectors)
}
