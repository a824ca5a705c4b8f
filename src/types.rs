//! Shared data structures for the spec-retrieval pipeline
//!
//! This module defines the core types that flow between stages:
//! - Catalog input: CatalogFile, ProductRecord, SpecEntry (ingested product JSON)
//! - Indexable units: Chunk, ChunkMetadata, ChunkId
//! - QA dataset: QaFile, QaItem
//! - Retrieval output: Evidence, EvidenceKind

use serde::{Deserialize, Serialize};

/// Category marking the per-product rollup chunk.
pub const FULL_SPECS_CATEGORY: &str = "Overall Specification";

/// Key marking the per-product rollup chunk.
pub const FULL_SPECS_KEY: &str = "Full Specs";

/// QA scope sentinel meaning "applies to every product".
pub const OVERALL_SCOPE: &str = "overall";

// ============================================================================
// Catalog Input
// ============================================================================

/// Root of the ingested product catalog file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub products: Vec<ProductRecord>,
}

/// One laptop model with its flat list of specifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(default = "default_product_id")]
    pub product_id: String,

    #[serde(default = "default_product_name")]
    pub product_name: String,

    #[serde(default)]
    pub specs: Vec<SpecEntry>,
}

fn default_product_id() -> String {
    "unknown".to_string()
}

fn default_product_name() -> String {
    "Unknown Product".to_string()
}

/// A single `(category, key, value)` specification row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpecEntry {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// `(product_id, product_name)` pair used for routing and product listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    pub product_id: String,
    pub product_name: String,
}

impl ProductRef {
    pub fn new(product_id: impl Into<String>, product_name: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
        }
    }
}

// ============================================================================
// Indexable Units
// ============================================================================

/// Stable arena index of a chunk inside a `VectorIndex`.
///
/// Assigned at insertion time; valid for the lifetime of the index that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkId(pub usize);

impl ChunkId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Categorical metadata attached to every chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub key: String,
}

impl ChunkMetadata {
    /// Look a field up by its mapping key.
    pub fn get(&self, field: &str) -> Option<&str> {
        match field {
            "product_id" => Some(&self.product_id),
            "product_name" => Some(&self.product_name),
            "category" => Some(&self.category),
            "key" => Some(&self.key),
            _ => None,
        }
    }

    /// Fields in their canonical order.
    pub fn entries(&self) -> [(&'static str, &str); 4] {
        [
            ("product_id", &self.product_id),
            ("product_name", &self.product_name),
            ("category", &self.category),
            ("key", &self.key),
        ]
    }
}

/// One indexable unit of evidence text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// True for the synthesized per-product rollup of every spec.
    pub fn is_full_specs(&self) -> bool {
        self.metadata.category == FULL_SPECS_CATEGORY && self.metadata.key == FULL_SPECS_KEY
    }

    pub fn product_id(&self) -> &str {
        &self.metadata.product_id
    }
}

// ============================================================================
// QA Dataset
// ============================================================================

/// Root of the QA dataset file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QaFile {
    #[serde(default)]
    pub qa_pairs: Vec<QaItem>,
}

/// A curated question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaItem {
    #[serde(default)]
    pub question: String,

    #[serde(default)]
    pub answer: String,

    /// Product suffix (e.g. `BXH`) or `overall`.
    #[serde(default = "default_scope")]
    pub product_name: String,
}

fn default_scope() -> String {
    OVERALL_SCOPE.to_string()
}

impl QaItem {
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        product_name: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            product_name: product_name.into(),
        }
    }

    /// Effective scope; an empty product name counts as `overall`.
    pub fn scope(&self) -> &str {
        if self.product_name.is_empty() {
            OVERALL_SCOPE
        } else {
            &self.product_name
        }
    }

    /// Text form used in both the assembled context and the evidence list.
    pub fn as_evidence_text(&self) -> String {
        format!("Q: {}\nA: {}", self.question, self.answer)
    }
}

// ============================================================================
// Retrieval Output
// ============================================================================

/// Source of an evidence item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
    Chunk,
    Qa,
}

impl std::fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvidenceKind::Chunk => write!(f, "chunk"),
            EvidenceKind::Qa => write!(f, "qa"),
        }
    }
}

/// One item that was placed into the assembled context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub kind: EvidenceKind,
    pub content: String,
    pub score: f32,
}
