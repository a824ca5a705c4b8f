//! Retrieval orchestrator - routes a query, runs the searches, assembles context
//!
//! `process(query)` produces the context string handed to the generator plus
//! an evidence list holding exactly the items that appear in that string, in
//! the same order.
//!
//! Context layout (sections joined by a blank line):
//!
//! ```text
//! [Verified Facts]          only when a fact was injected
//! FACT: ...
//!
//! [Retrieval Results]
//! {chunk}\n[信心分數: 0.87]
//! ---
//! ...
//!
//! [QA Database]
//! Q: ...\nA: ...\nScore: 0.91
//! ```

use serde::Serialize;
use tracing::{debug, info};

use super::product_extractor::{product_suffix, ProductNameExtractor};
use super::qa_index::{QaIndex, ScoredQa};
use super::router::{IntentRouter, RetrievalMode, Route};
use super::vector_index::{ScoredChunk, VectorIndex};
use super::RetrievalError;
use crate::config::RetrievalConfig;
use crate::types::{Evidence, EvidenceKind, ProductRef, OVERALL_SCOPE};

/// Score assigned to Full-Specs chunks returned without a search.
pub const COMPARISON_SCORE: f32 = 1.0;

/// Separator between items inside one context section.
const ITEM_SEPARATOR: &str = "\n---\n";

/// Whether Full-Specs chunks survive into the context.
///
/// Comparison mode always keeps them. Otherwise an injected fact, or a top
/// hybrid score strictly above `threshold`, drops them.
pub fn include_full_specs(
    mode: &RetrievalMode,
    has_facts: bool,
    top_score: Option<f32>,
    threshold: f32,
) -> bool {
    if *mode == RetrievalMode::Comparison {
        return true;
    }
    if has_facts {
        return false;
    }
    !matches!(top_score, Some(s) if s > threshold)
}

/// Result of one `process` call.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalOutcome {
    pub route: Route,
    /// Deterministic fact strings injected ahead of the retrieval results.
    pub facts: Vec<String>,
    pub context: String,
    pub evidence: Vec<Evidence>,
}

/// Owns both indices and the router; immutable once constructed.
#[derive(Debug)]
pub struct RetrievalOrchestrator {
    index: VectorIndex,
    qa: QaIndex,
    router: IntentRouter,
    config: RetrievalConfig,
}

impl RetrievalOrchestrator {
    pub fn new(
        index: VectorIndex,
        qa: QaIndex,
        products: Vec<ProductRef>,
        config: RetrievalConfig,
    ) -> Self {
        let extractor = ProductNameExtractor::from_products(products);
        if extractor.catalog().is_fallback() {
            info!("No products in catalog, using built-in model suffixes");
        }
        Self {
            index,
            qa,
            router: IntentRouter::new(extractor),
            config,
        }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn qa(&self) -> &QaIndex {
        &self.qa
    }

    pub fn router(&self) -> &IntentRouter {
        &self.router
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Route `query`, retrieve evidence, and assemble the generator context.
    ///
    /// # Errors
    ///
    /// Embedding failures from either search propagate unchanged.
    pub fn process(&self, query: &str) -> Result<RetrievalOutcome, RetrievalError> {
        let route = self.router.route(query);
        info!(mode = %route.mode, product = ?route.product_id, "Processing query");

        let mut facts = Vec::new();
        let top_k = self.config.chunk_top_k;

        let hits: Vec<ScoredChunk<'_>> = match &route.mode {
            RetrievalMode::Comparison => {
                let hits = self.full_specs_hits();
                info!(chunks = hits.len(), "Comparison mode, returning Full-Specs chunks without search");
                hits
            }
            RetrievalMode::SpecificProduct(product_id) => {
                let candidates = self.index.product_chunk_ids(product_id);
                info!(product = %product_id, candidates = candidates.len(), "Restricting search to product");
                self.index.search(query, top_k, Some(candidates))?
            }
            RetrievalMode::ProductList => {
                let fact = self.product_list_fact();
                info!(fact = %fact, "Injected product list");
                facts.push(fact);
                self.index.search(query, top_k, None)?
            }
            RetrievalMode::General => self.index.search(query, top_k, None)?,
        };

        let keep_full_specs = include_full_specs(
            &route.mode,
            !facts.is_empty(),
            hits.first().map(|h| h.score),
            self.config.full_specs_score_threshold,
        );
        let hits: Vec<ScoredChunk<'_>> = hits
            .into_iter()
            .filter(|h| keep_full_specs || !h.chunk.is_full_specs())
            .collect();

        let scope = route
            .product_id
            .as_deref()
            .map(product_suffix)
            .unwrap_or_else(|| OVERALL_SCOPE.to_string());
        let qa_hits = self.qa.search(query, &scope, self.config.qa_top_k)?;

        debug!(
            chunks = hits.len(),
            qa = qa_hits.len(),
            full_specs = keep_full_specs,
            scope = %scope,
            "Retrieval complete"
        );

        let (context, evidence) = assemble(&facts, &hits, &qa_hits);
        debug!("Assembled context:\n{}", context);

        Ok(RetrievalOutcome {
            route,
            facts,
            context,
            evidence,
        })
    }

    fn full_specs_hits(&self) -> Vec<ScoredChunk<'_>> {
        self.index
            .full_specs_ids()
            .iter()
            .filter_map(|&id| {
                self.index.chunk(id).map(|chunk| ScoredChunk {
                    id,
                    chunk,
                    score: COMPARISON_SCORE,
                })
            })
            .collect()
    }

    fn product_list_fact(&self) -> String {
        let names = self.router.extractor().catalog().product_names();
        format!(
            "FACT: The available products in the database are: {}.",
            names.join(", ")
        )
    }
}

/// Build the context string and the matching evidence list.
fn assemble(
    facts: &[String],
    hits: &[ScoredChunk<'_>],
    qa_hits: &[ScoredQa<'_>],
) -> (String, Vec<Evidence>) {
    let mut evidence = Vec::with_capacity(hits.len() + qa_hits.len());

    let chunk_section = hits
        .iter()
        .map(|h| {
            evidence.push(Evidence {
                kind: EvidenceKind::Chunk,
                content: h.chunk.content.clone(),
                score: h.score,
            });
            format!("{}\n[信心分數: {:.2}]", h.chunk.content, h.score)
        })
        .collect::<Vec<_>>()
        .join(ITEM_SEPARATOR);

    let qa_section = qa_hits
        .iter()
        .map(|h| {
            evidence.push(Evidence {
                kind: EvidenceKind::Qa,
                content: h.item.as_evidence_text(),
                score: h.score,
            });
            format!(
                "Q: {}\nA: {}\nScore: {:.2}",
                h.item.question, h.item.answer, h.score
            )
        })
        .collect::<Vec<_>>()
        .join(ITEM_SEPARATOR);

    let mut parts = Vec::with_capacity(3);
    if !facts.is_empty() {
        parts.push(format!("[Verified Facts]\n{}", facts.join("\n")));
    }
    parts.push(format!("[Retrieval Results]\n{chunk_section}"));
    parts.push(format!("[QA Database]\n{qa_section}"));

    (parts.join("\n\n"), evidence)
}
