//! Retrieval Module - hybrid chunk search, QA search, and intent routing
//!
//! ## Architecture
//!
//! - **VectorIndex**: chunk arena with unit vectors; cosine + keyword-bonus
//!   hybrid search over a candidate subset
//! - **QaIndex**: curated question/answer pairs, product-scoped cosine search
//! - **IntentRouter**: keyword rules that pick one of four retrieval modes
//! - **ProductNameExtractor**: model-suffix matching against the catalog
//! - **RetrievalOrchestrator**: `process(query)` → context string + evidence
//!
//! Indices are built once and never mutated afterwards, so a constructed
//! orchestrator can be shared across threads behind an `Arc` without locking.

use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::types::ChunkId;

pub mod orchestrator;
pub mod product_extractor;
pub mod qa_index;
pub mod router;
pub mod vector_index;

pub use orchestrator::{include_full_specs, RetrievalOrchestrator, RetrievalOutcome};
pub use product_extractor::{product_suffix, ProductCatalog, ProductNameExtractor, FALLBACK_SUFFIXES};
pub use qa_index::{QaIndex, ScoredQa};
pub use router::{IntentRouter, RetrievalMode, Route};
pub use vector_index::{HybridScoring, ScoredChunk, VectorIndex};

/// Errors raised while building or querying the indices.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("Chunk {id} is not part of the indexed corpus ({len} chunks)")]
    UnknownChunk { id: ChunkId, len: usize },

    #[error("Vector index was already built ({0} chunks); build a new index instead")]
    IndexAlreadyBuilt(usize),
}
