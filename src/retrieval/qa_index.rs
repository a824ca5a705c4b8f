//! QA index - curated question/answer pairs with product-scoped search
//!
//! Question texts are embedded once at load. A search only considers pairs
//! scoped to the requested product or to `overall`; when nothing matches the
//! scope the whole dataset is searched instead, so a scope mismatch alone never
//! produces an empty result.
//!
//! Loading from disk degrades: a missing or malformed dataset file logs a
//! warning and yields an empty index.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::embedding::{dot, embed_all, embed_normalized, Embedder, EmbeddingError};
use crate::types::{QaFile, QaItem, OVERALL_SCOPE};

/// A QA hit with its cosine similarity.
#[derive(Debug, Clone, Copy)]
pub struct ScoredQa<'a> {
    pub item: &'a QaItem,
    pub score: f32,
}

/// Read-only QA dataset with unit question vectors.
pub struct QaIndex {
    embedder: Arc<dyn Embedder>,
    items: Vec<QaItem>,
    vectors: Vec<Vec<f32>>,
}

impl std::fmt::Debug for QaIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QaIndex")
            .field("embedder", &self.embedder.name())
            .field("items", &self.items.len())
            .finish_non_exhaustive()
    }
}

impl QaIndex {
    /// An index with no pairs; every search returns nothing.
    pub fn empty(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            items: Vec::new(),
            vectors: Vec::new(),
        }
    }

    /// Embed every question (one call each) and build the index.
    pub fn load(embedder: Arc<dyn Embedder>, items: Vec<QaItem>) -> Result<Self, EmbeddingError> {
        let vectors = embed_all(
            embedder.as_ref(),
            items.iter().map(|q| q.question.as_str()),
            |done, total| {
                if done % 10 == 0 {
                    info!("Embedding QA question {}/{}", done, total);
                }
            },
        )?;
        Ok(Self {
            embedder,
            items,
            vectors,
        })
    }

    /// Load a QA dataset file.
    ///
    /// I/O and JSON errors are logged and produce an empty index. Embedding
    /// failures still propagate.
    pub fn load_file(embedder: Arc<dyn Embedder>, path: &Path) -> Result<Self, EmbeddingError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "QA dataset not readable, continuing without QA");
                return Ok(Self::empty(embedder));
            }
        };

        let file: QaFile = match serde_json::from_str(&contents) {
            Ok(f) => f,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "QA dataset malformed, continuing without QA");
                return Ok(Self::empty(embedder));
            }
        };

        let index = Self::load(embedder, file.qa_pairs)?;
        info!(path = %path.display(), pairs = index.len(), "Loaded QA dataset");
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[QaItem] {
        &self.items
    }

    /// Indices of the pairs visible under `scope`, falling back to all pairs.
    fn scoped_indices(&self, scope: &str) -> Vec<usize> {
        let wanted = scope.to_uppercase();
        let scoped: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, qa)| {
                let s = qa.scope();
                s == OVERALL_SCOPE || s.to_uppercase() == wanted
            })
            .map(|(i, _)| i)
            .collect();

        if scoped.is_empty() {
            debug!(scope, "No QA pairs in scope, searching all pairs");
            (0..self.items.len()).collect()
        } else {
            scoped
        }
    }

    /// Cosine search over the pairs visible under `product_scope`.
    ///
    /// Returns nothing without embedding the query when the index is empty.
    /// Ties keep dataset order.
    pub fn search(
        &self,
        query: &str,
        product_scope: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredQa<'_>>, EmbeddingError> {
        if self.items.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self.scoped_indices(product_scope);
        let expected_dim = self.vectors.first().map(Vec::len);
        let query_vec = embed_normalized(self.embedder.as_ref(), query, expected_dim)?;

        let mut scored: Vec<ScoredQa<'_>> = candidates
            .into_iter()
            .map(|i| ScoredQa {
                item: &self.items[i],
                score: dot(&self.vectors[i], &query_vec),
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }
}
