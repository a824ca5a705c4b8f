//! spec-rag: hardware-spec question answering
//!
//! Retrieval-augmented assistant for a fixed catalog of laptop models.
//!
//! ## Architecture
//!
//! - **Catalog**: product-spec JSON → indexable chunks (one per spec row plus
//!   one Full-Specs rollup per product)
//! - **Embedding**: `Embedder` trait with HTTP and offline hashing backends
//! - **Retrieval**: hybrid vector index, product-scoped QA index, intent
//!   router, and the orchestrator that assembles generator context
//! - **LLM Module**: streaming generation, prompts, answer clean-up
//! - **RagSystem**: end-to-end `question → answer` facade
//! - **Batch**: CSV question sets answered with per-row timing
//!
//! Everything is synchronous. Indices are built once and are read-only
//! afterwards.

pub mod batch;
pub mod catalog;
pub mod config;
pub mod embedding;
pub mod llm;
pub mod rag;
pub mod retrieval;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, RagConfig};

// Re-export commonly used types
pub use types::{Chunk, ChunkId, ChunkMetadata, Evidence, EvidenceKind, ProductRef, QaItem};

// Re-export retrieval components
pub use retrieval::{
    IntentRouter, QaIndex, RetrievalError, RetrievalMode, RetrievalOrchestrator,
    RetrievalOutcome, VectorIndex,
};

// Re-export backends
pub use embedding::{Embedder, EmbeddingError};
pub use llm::{GenerationError, Generator, TokenStream};

pub use catalog::{CatalogError, SpecCatalog};
pub use batch::{BatchError, BatchQuestion, BatchSummary};
pub use rag::{QueryResponse, RagError, RagSystem};
