//! Vector index over spec chunks
//!
//! Chunks live in an insertion-ordered arena; `ChunkId(i)` addresses both
//! `chunks[i]` and its unit vector `vectors[i]`. Search scores each candidate
//! with a hybrid of cosine similarity and a capped keyword-overlap bonus:
//!
//! ```text
//! hybrid = cos(q, c) + min(weight × |query tokens found in content|, cap)
//! ```
//!
//! The bonus pulls exact-term matches (model suffixes, port names) above text
//! that is merely semantically close.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use super::RetrievalError;
use crate::config::RetrievalConfig;
use crate::embedding::{dot, embed_all, embed_normalized, Embedder};
use crate::types::{Chunk, ChunkId};

/// Keyword-bonus parameters for hybrid scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridScoring {
    /// Bonus per query token found in the chunk.
    pub keyword_weight: f32,
    /// Upper bound on the total bonus.
    pub keyword_bonus_cap: f32,
}

impl Default for HybridScoring {
    fn default() -> Self {
        Self {
            keyword_weight: 0.05,
            keyword_bonus_cap: 0.5,
        }
    }
}

impl HybridScoring {
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self {
            keyword_weight: config.keyword_weight,
            keyword_bonus_cap: config.keyword_bonus_cap,
        }
    }

    /// Bonus for `tokens` against an already lower-cased chunk body.
    #[allow(clippy::cast_precision_loss)]
    pub fn keyword_bonus(&self, tokens: &HashSet<String>, content_lower: &str) -> f32 {
        let overlap = tokens
            .iter()
            .filter(|t| content_lower.contains(t.as_str()))
            .count();
        (self.keyword_weight * overlap as f32).min(self.keyword_bonus_cap)
    }
}

/// Lower-cased whitespace tokens of a query, deduplicated.
pub fn query_tokens(query: &str) -> HashSet<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// A search hit: arena id, borrowed chunk, hybrid score.
#[derive(Debug, Clone, Copy)]
pub struct ScoredChunk<'a> {
    pub id: ChunkId,
    pub chunk: &'a Chunk,
    pub score: f32,
}

/// Immutable-after-build chunk index.
pub struct VectorIndex {
    embedder: Arc<dyn Embedder>,
    scoring: HybridScoring,
    chunks: Vec<Chunk>,
    /// Lower-cased chunk bodies for the keyword bonus.
    lowered: Vec<String>,
    vectors: Vec<Vec<f32>>,
    by_product: HashMap<String, Vec<ChunkId>>,
    full_specs: Vec<ChunkId>,
    /// Set by the first successful `add_chunks`, even for an empty corpus.
    built: bool,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("embedder", &self.embedder.name())
            .field("scoring", &self.scoring)
            .field("chunks", &self.chunks.len())
            .field("products", &self.by_product.len())
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// Create an empty index. Populate it with [`VectorIndex::add_chunks`].
    pub fn new(embedder: Arc<dyn Embedder>, scoring: HybridScoring) -> Self {
        Self {
            embedder,
            scoring,
            chunks: Vec::new(),
            lowered: Vec::new(),
            vectors: Vec::new(),
            by_product: HashMap::new(),
            full_specs: Vec::new(),
            built: false,
        }
    }

    /// Create and populate an index in one step.
    pub fn build(
        embedder: Arc<dyn Embedder>,
        scoring: HybridScoring,
        chunks: Vec<Chunk>,
    ) -> Result<Self, RetrievalError> {
        let mut index = Self::new(embedder, scoring);
        index.add_chunks(chunks)?;
        Ok(index)
    }

    /// Embed and index every chunk. One embedder call per chunk.
    ///
    /// Allowed once per index. Any later call returns
    /// [`RetrievalError::IndexAlreadyBuilt`], including after an empty build.
    /// An embedding failure leaves the index empty and unbuilt. Either way the
    /// index is never half-populated.
    pub fn add_chunks(&mut self, chunks: Vec<Chunk>) -> Result<(), RetrievalError> {
        if self.built {
            return Err(RetrievalError::IndexAlreadyBuilt(self.chunks.len()));
        }

        let vectors = embed_all(
            self.embedder.as_ref(),
            chunks.iter().map(|c| c.content.as_str()),
            |done, total| {
                if done % 10 == 0 {
                    info!("Embedding chunk {}/{}", done, total);
                }
            },
        )?;

        let mut by_product: HashMap<String, Vec<ChunkId>> = HashMap::new();
        let mut full_specs = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let id = ChunkId(i);
            by_product
                .entry(chunk.metadata.product_id.clone())
                .or_default()
                .push(id);
            if chunk.is_full_specs() {
                full_specs.push(id);
            }
        }

        self.lowered = chunks.iter().map(|c| c.content.to_lowercase()).collect();
        self.vectors = vectors;
        self.chunks = chunks;
        self.by_product = by_product;
        self.full_specs = full_specs;
        self.built = true;

        info!(
            chunks = self.chunks.len(),
            products = self.by_product.len(),
            embedder = self.embedder.name(),
            "Vector index built"
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn scoring(&self) -> HybridScoring {
        self.scoring
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// All chunks in arena order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, id: ChunkId) -> Option<&Chunk> {
        self.chunks.get(id.index())
    }

    /// Unit vector stored for a chunk.
    pub fn vector(&self, id: ChunkId) -> Option<&[f32]> {
        self.vectors.get(id.index()).map(Vec::as_slice)
    }

    /// Ids of every chunk in arena order.
    pub fn ids(&self) -> impl Iterator<Item = ChunkId> + '_ {
        (0..self.chunks.len()).map(ChunkId)
    }

    /// Ids of one product's chunks, in arena order. Empty for unknown products.
    pub fn product_chunk_ids(&self, product_id: &str) -> &[ChunkId] {
        self.by_product
            .get(product_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Ids of every Full-Specs chunk, in arena order.
    pub fn full_specs_ids(&self) -> &[ChunkId] {
        &self.full_specs
    }

    /// Hybrid search over `candidates` (or the whole corpus when `None`).
    ///
    /// Results are ordered by descending hybrid score; ties keep candidate
    /// order. Duplicate candidate ids count once. An empty candidate set
    /// yields an empty result, not an error.
    ///
    /// # Errors
    ///
    /// - [`RetrievalError::Embedding`] if the query cannot be embedded
    /// - [`RetrievalError::UnknownChunk`] if a candidate id is outside the arena
    pub fn search(
        &self,
        query: &str,
        top_k: usize,
        candidates: Option<&[ChunkId]>,
    ) -> Result<Vec<ScoredChunk<'_>>, RetrievalError> {
        let expected_dim = self.vectors.first().map(Vec::len);
        let query_vec = embed_normalized(self.embedder.as_ref(), query, expected_dim)?;
        let tokens = query_tokens(query);

        let targets = self.resolve_candidates(candidates)?;
        if targets.is_empty() {
            debug!("No candidates to search");
            return Ok(Vec::new());
        }

        let mut scored: Vec<ScoredChunk<'_>> = targets
            .into_iter()
            .map(|id| {
                let i = id.index();
                let cosine = dot(&self.vectors[i], &query_vec);
                let bonus = self.scoring.keyword_bonus(&tokens, &self.lowered[i]);
                ScoredChunk {
                    id,
                    chunk: &self.chunks[i],
                    score: cosine + bonus,
                }
            })
            .collect();

        // Stable sort keeps candidate order among equal scores.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);

        debug!(
            hits = scored.len(),
            top_score = scored.first().map(|s| s.score),
            "Chunk search complete"
        );
        Ok(scored)
    }

    fn resolve_candidates(
        &self,
        candidates: Option<&[ChunkId]>,
    ) -> Result<Vec<ChunkId>, RetrievalError> {
        let Some(ids) = candidates else {
            return Ok(self.ids().collect());
        };

        let mut seen = HashSet::with_capacity(ids.len());
        let mut out = Vec::with_capacity(ids.len());
        for &id in ids {
            if id.index() >= self.chunks.len() {
                return Err(RetrievalError::UnknownChunk {
                    id,
                    len: self.chunks.len(),
                });
            }
            if seen.insert(id) {
                out.push(id);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingError;
    use crate::types::{ChunkMetadata, FULL_SPECS_CATEGORY, FULL_SPECS_KEY};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Maps known texts to fixed vectors; anything else gets `fallback`.
    struct TableEmbedder {
        table: HashMap<String, Vec<f32>>,
        fallback: Vec<f32>,
        calls: AtomicUsize,
    }

    impl TableEmbedder {
        fn new(entries: &[(&str, [f32; 2])], fallback: [f32; 2]) -> Self {
            Self {
                table: entries
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), v.to_vec()))
                    .collect(),
                fallback: fallback.to_vec(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Embedder for TableEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.table.get(text).cloned().unwrap_or_else(|| self.fallback.clone()))
        }

        fn name(&self) -> &'static str {
            "table"
        }
    }

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Backend {
                backend: "failing",
                message: "model offline".to_string(),
            })
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn chunk(content: &str, product: &str, category: &str, key: &str) -> Chunk {
        Chunk {
            content: content.to_string(),
            metadata: ChunkMetadata {
                product_id: product.to_string(),
                product_name: product.to_uppercase(),
                category: category.to_string(),
                key: key.to_string(),
            },
        }
    }

    fn corpus() -> Vec<Chunk> {
        vec![
            chunk("alpha cpu", "p1", "Processor", "CPU"),
            chunk("beta gpu", "p1", "Graphics", "GPU"),
            chunk("p1 rollup", "p1", FULL_SPECS_CATEGORY, FULL_SPECS_KEY),
            chunk("gamma cpu", "p2", "Processor", "CPU"),
            chunk("p2 rollup", "p2", FULL_SPECS_CATEGORY, FULL_SPECS_KEY),
        ]
    }

    fn table() -> TableEmbedder {
        TableEmbedder::new(
            &[
                ("alpha cpu", [1.0, 0.0]),
                ("beta gpu", [0.0, 1.0]),
                ("p1 rollup", [0.6, 0.8]),
                ("gamma cpu", [0.8, 0.6]),
                ("p2 rollup", [0.5, 0.5]),
                ("zzz", [1.0, 0.0]),
            ],
            [0.0, 1.0],
        )
    }

    fn index() -> VectorIndex {
        VectorIndex::build(Arc::new(table()), HybridScoring::default(), corpus()).unwrap()
    }

    #[test]
    fn test_build_tracks_products_and_full_specs() {
        let idx = index();
        assert_eq!(idx.len(), 5);
        assert_eq!(idx.product_chunk_ids("p1"), &[ChunkId(0), ChunkId(1), ChunkId(2)]);
        assert_eq!(idx.full_specs_ids(), &[ChunkId(2), ChunkId(4)]);
        assert!(idx.product_chunk_ids("p9").is_empty());
    }

    #[test]
    fn test_vectors_are_unit_length() {
        let idx = index();
        for id in idx.ids() {
            let v = idx.vector(id).unwrap();
            let n: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((n - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_search_without_keyword_overlap_is_pure_cosine() {
        let idx = index();
        // "zzz" embeds to [1, 0] and appears in no chunk
        let hits = idx.search("zzz", 5, None).unwrap();
        assert_eq!(hits[0].id, ChunkId(0));
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        let gpu = hits.iter().find(|h| h.id == ChunkId(1)).unwrap();
        assert!(gpu.score.abs() < 1e-6);
    }

    #[test]
    fn test_keyword_bonus_reorders() {
        let embedder = TableEmbedder::new(
            &[("sigma one", [1.0, 0.0]), ("tau two", [0.96, 0.28])],
            [1.0, 0.0],
        );
        let chunks = vec![
            chunk("sigma one", "p1", "Misc", "A"),
            chunk("tau two", "p1", "Misc", "B"),
        ];
        let idx = VectorIndex::build(Arc::new(embedder), HybridScoring::default(), chunks).unwrap();

        // Not a table key, so the query embeds to [1, 0]. Cosine alone ranks
        // chunk 0 first (1.0 vs 0.96); both tokens occur only in chunk 1.
        let hits = idx.search("two tau", 2, None).unwrap();
        assert_eq!(hits[0].id, ChunkId(1));
        assert!((hits[0].score - 1.06).abs() < 1e-5);
        assert_eq!(hits[1].id, ChunkId(0));
        assert!((hits[1].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_keyword_bonus_is_capped() {
        let scoring = HybridScoring {
            keyword_weight: 0.3,
            keyword_bonus_cap: 0.5,
        };
        let tokens = query_tokens("a b c");
        assert!((scoring.keyword_bonus(&tokens, "a b c") - 0.5).abs() < f32::EPSILON);
        assert_eq!(scoring.keyword_bonus(&tokens, "xyz"), 0.0);
    }

    #[test]
    fn test_query_tokens_dedup_and_lowercase() {
        let tokens = query_tokens("  RTX rtx   Laptop ");
        assert_eq!(tokens.len(), 2);
        assert!(tokens.contains("rtx"));
        assert!(tokens.contains("laptop"));
    }

    #[test]
    fn test_candidates_restrict_results() {
        let idx = index();
        let hits = idx.search("zzz", 10, Some(idx.product_chunk_ids("p2"))).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.chunk.product_id() == "p2"));
    }

    #[test]
    fn test_empty_candidates_return_empty() {
        let idx = index();
        assert!(idx.search("zzz", 3, Some(&[])).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_candidate_is_error() {
        let idx = index();
        let err = idx.search("zzz", 3, Some(&[ChunkId(0), ChunkId(42)])).unwrap_err();
        assert!(matches!(err, RetrievalError::UnknownChunk { id: ChunkId(42), len: 5 }));
    }

    #[test]
    fn test_duplicate_candidates_count_once() {
        let idx = index();
        let hits = idx.search("zzz", 10, Some(&[ChunkId(1), ChunkId(1), ChunkId(0)])).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_ties_keep_candidate_order() {
        // Neither body is in the table, so both embed to the same fallback vector.
        let chunks = vec![
            chunk("first twin", "p1", "Audio", "Speakers"),
            chunk("second twin", "p1", "Audio", "Speakers"),
        ];
        let idx = VectorIndex::build(Arc::new(table()), HybridScoring::default(), chunks).unwrap();

        let forward = idx.search("zzz", 2, Some(&[ChunkId(0), ChunkId(1)])).unwrap();
        let reverse = idx.search("zzz", 2, Some(&[ChunkId(1), ChunkId(0)])).unwrap();
        assert_eq!(forward[0].score, forward[1].score);
        assert_eq!(forward[0].id, ChunkId(0));
        assert_eq!(reverse[0].id, ChunkId(1));
    }

    #[test]
    fn test_top_k_zero_and_overflow() {
        let idx = index();
        assert!(idx.search("zzz", 0, None).unwrap().is_empty());
        assert_eq!(idx.search("zzz", 100, None).unwrap().len(), 5);
    }

    #[test]
    fn test_add_chunks_twice_is_rejected() {
        let mut idx = index();
        let err = idx.add_chunks(corpus()).unwrap_err();
        assert!(matches!(err, RetrievalError::IndexAlreadyBuilt(5)));
        assert_eq!(idx.len(), 5);
    }

    #[test]
    fn test_empty_build_still_counts_as_built() {
        let mut idx = VectorIndex::new(Arc::new(table()), HybridScoring::default());
        idx.add_chunks(Vec::new()).unwrap();
        let err = idx.add_chunks(corpus()).unwrap_err();
        assert!(matches!(err, RetrievalError::IndexAlreadyBuilt(0)));
        assert!(idx.is_empty());
        assert!(idx.full_specs_ids().is_empty());
    }

    #[test]
    fn test_failed_build_leaves_index_empty() {
        let mut idx = VectorIndex::new(Arc::new(FailingEmbedder), HybridScoring::default());
        assert!(idx.add_chunks(corpus()).is_err());
        assert!(idx.is_empty());
        assert!(idx.full_specs_ids().is_empty());
        // Not built, so a retry is still allowed
        assert!(matches!(
            idx.add_chunks(corpus()),
            Err(RetrievalError::Embedding(_))
        ));
    }

    #[test]
    fn test_one_embed_call_per_chunk_plus_query() {
        let embedder = Arc::new(table());
        let idx = VectorIndex::build(embedder.clone(), HybridScoring::default(), corpus()).unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 5);
        idx.search("zzz", 1, None).unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 6);
    }
}
