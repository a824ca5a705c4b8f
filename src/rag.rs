//! Question-answering facade: retrieval orchestrator + generator.
//!
//! ```text
//! question ─► RetrievalOrchestrator::process ─► context
//!          ─► "Context:\n{context}\n\nQuestion: {question}"
//!          ─► Generator::generate(SYSTEM_PROMPT, prompt) ─► TokenStream
//! ```

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::{CatalogError, SpecCatalog};
use crate::config::{defaults, EmbeddingBackend, EmbeddingConfig, GenerationConfig, RagConfig};
use crate::embedding::{Embedder, EmbeddingError, HashingEmbedder, HttpEmbedder};
use crate::llm::{
    build_user_prompt, collect_stream, postprocess_answer, GenerationError, Generator,
    HttpGenerator, TokenStream, SYSTEM_PROMPT,
};
use crate::retrieval::{
    HybridScoring, QaIndex, RetrievalError, RetrievalOrchestrator, RetrievalOutcome, VectorIndex,
};
use crate::types::Evidence;

/// Errors surfaced by [`RagSystem`].
#[derive(Debug, Error)]
pub enum RagError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Full answer with the evidence it was generated from.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub question: String,
    pub retrieval_results: Vec<Evidence>,
    pub answer: String,
}

/// Construct the embedder selected in config.
pub fn embedder_from_config(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    let embedder: Arc<dyn Embedder> = match config.backend {
        EmbeddingBackend::Hashing => Arc::new(HashingEmbedder::new(config.hashing_dimensions)),
        EmbeddingBackend::Http => Arc::new(HttpEmbedder::new(config.http_config())?),
    };
    info!(backend = embedder.name(), "Embedding backend ready");
    Ok(embedder)
}

/// Load the catalog and QA dataset, embed both, and wire the orchestrator.
///
/// Catalog failures are fatal. QA file problems degrade to an empty QA index.
pub fn build_orchestrator(
    config: &RagConfig,
    embedder: Arc<dyn Embedder>,
) -> Result<RetrievalOrchestrator, RagError> {
    let catalog = SpecCatalog::load(&config.data.catalog_path)?;
    let chunks = catalog.chunks();
    info!(products = catalog.len(), chunks = chunks.len(), "Indexing catalog");

    let index = VectorIndex::build(
        Arc::clone(&embedder),
        HybridScoring::from_config(&config.retrieval),
        chunks,
    )?;
    let qa = QaIndex::load_file(embedder, &config.data.qa_path)?;

    Ok(RetrievalOrchestrator::new(
        index,
        qa,
        catalog.products(),
        config.retrieval,
    ))
}

/// Retrieval-augmented spec assistant.
pub struct RagSystem {
    orchestrator: RetrievalOrchestrator,
    generator: Arc<dyn Generator>,
    generation: GenerationConfig,
}

impl std::fmt::Debug for RagSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagSystem")
            .field("orchestrator", &self.orchestrator)
            .field("generator", &self.generator.backend_name())
            .finish_non_exhaustive()
    }
}

impl RagSystem {
    pub fn new(
        orchestrator: RetrievalOrchestrator,
        generator: Arc<dyn Generator>,
        generation: GenerationConfig,
    ) -> Self {
        Self {
            orchestrator,
            generator,
            generation,
        }
    }

    /// Build every component from config.
    pub fn build(config: &RagConfig) -> Result<Self, RagError> {
        let embedder = embedder_from_config(&config.embedding)?;
        let generator: Arc<dyn Generator> =
            Arc::new(HttpGenerator::new(config.generation.http_config())?);
        Self::build_with(config, embedder, generator)
    }

    /// Build from config with caller-supplied backends.
    pub fn build_with(
        config: &RagConfig,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self, RagError> {
        let orchestrator = build_orchestrator(config, embedder)?;
        info!(generator = generator.backend_name(), "RAG system ready");
        Ok(Self::new(orchestrator, generator, config.generation.clone()))
    }

    pub fn orchestrator(&self) -> &RetrievalOrchestrator {
        &self.orchestrator
    }

    /// Retrieval only: context and evidence, no generation.
    pub fn retrieve(&self, question: &str) -> Result<RetrievalOutcome, RagError> {
        Ok(self.orchestrator.process(question)?)
    }

    /// Answer `question` as a token stream.
    pub fn query(&self, question: &str) -> Result<TokenStream, RagError> {
        let outcome = self.retrieve(question)?;
        self.stream_answer(question, &outcome.context)
    }

    /// Answer `question` in full, alongside the evidence used.
    ///
    /// Answer clean-up runs only when `generation.postprocess` is enabled.
    pub fn query_with_metadata(&self, question: &str) -> Result<QueryResponse, RagError> {
        let outcome = self.retrieve(question)?;
        let raw = collect_stream(self.stream_answer(question, &outcome.context)?)?;

        Ok(QueryResponse {
            question: question.to_string(),
            retrieval_results: outcome.evidence,
            answer: self.finalize_answer(raw, question),
        })
    }

    /// Apply answer clean-up if `generation.postprocess` is enabled.
    pub fn finalize_answer(&self, raw: String, question: &str) -> String {
        if self.generation.postprocess {
            postprocess_answer(&raw, question)
        } else {
            raw
        }
    }

    /// Start generating from an already assembled context.
    pub fn stream_answer(&self, question: &str, context: &str) -> Result<TokenStream, RagError> {
        let prompt = build_user_prompt(context, question);

        let estimated = (SYSTEM_PROMPT.chars().count() + prompt.chars().count())
            / defaults::CHARS_PER_TOKEN_ESTIMATE;
        let budget = self
            .generation
            .context_length
            .saturating_sub(self.generation.max_tokens as usize);
        if estimated > budget {
            warn!(
                estimated_tokens = estimated,
                budget, "Prompt may exceed the model context window"
            );
        }

        Ok(self.generator.generate(SYSTEM_PROMPT, &prompt)?)
    }
}
