//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use spec_rag::embedding::{Embedder, EmbeddingError, HashingEmbedder};
use spec_rag::types::{Chunk, ChunkMetadata, FULL_SPECS_CATEGORY, FULL_SPECS_KEY};

/// Maps exact texts to fixed 2-d vectors; unknown text gets `fallback`.
pub struct TableEmbedder {
    table: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
}

impl TableEmbedder {
    pub fn new(entries: &[(&str, [f32; 2])], fallback: [f32; 2]) -> Self {
        Self {
            table: entries
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.to_vec()))
                .collect(),
            fallback: fallback.to_vec(),
        }
    }
}

impl Embedder for TableEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self
            .table
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }

    fn name(&self) -> &'static str {
        "table"
    }
}

/// Counts every call made to the wrapped embedder.
pub struct CountingEmbedder<E> {
    inner: E,
    calls: AtomicUsize,
}

impl<E: Embedder> CountingEmbedder<E> {
    pub fn new(inner: E) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<E: Embedder> Embedder for CountingEmbedder<E> {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(text)
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

pub fn hashing() -> Arc<dyn Embedder> {
    Arc::new(HashingEmbedder::new(256))
}

pub fn spec_chunk(content: &str, product_id: &str, category: &str, key: &str) -> Chunk {
    Chunk {
        content: content.to_string(),
        metadata: ChunkMetadata {
            product_id: product_id.to_string(),
            product_name: product_id.to_uppercase(),
            category: category.to_string(),
            key: key.to_string(),
        },
    }
}

pub fn full_specs_chunk(content: &str, product_id: &str) -> Chunk {
    spec_chunk(content, product_id, FULL_SPECS_CATEGORY, FULL_SPECS_KEY)
}

/// Three-model catalog in the ingestion format.
pub const CATALOG_JSON: &str = r#"{
  "products": [
    {
      "product_id": "aorus-master-16-bxh",
      "product_name": "AORUS MASTER 16 BXH",
      "specs": [
        {"category": "Processor", "key": "CPU", "value": "Intel Core Ultra 9 275HX"},
        {"category": "Graphics", "key": "GPU", "value": "NVIDIA GeForce RTX 5090 Laptop GPU"},
        {"category": "Physical", "key": "Weight", "value": "2.5 kg"}
      ]
    },
    {
      "product_id": "aorus-master-16-byh",
      "product_name": "AORUS MASTER 16 BYH",
      "specs": [
        {"category": "Processor", "key": "CPU", "value": "Intel Core Ultra 9 275HX"},
        {"category": "Graphics", "key": "GPU", "value": "NVIDIA GeForce RTX 5080 Laptop GPU"},
        {"category": "Physical", "key": "Weight", "value": "2.5 kg"}
      ]
    },
    {
      "product_id": "aorus-master-16-bzh",
      "product_name": "AORUS MASTER 16 BZH",
      "specs": [
        {"category": "Processor", "key": "CPU", "value": "Intel Core Ultra 7 255HX"},
        {"category": "Graphics", "key": "GPU", "value": "NVIDIA GeForce RTX 5070 Ti Laptop GPU"},
        {"category": "Physical", "key": "Weight", "value": "2.4 kg"}
      ]
    }
  ]
}"#;

/// QA dataset with one global and one product-scoped pair.
pub const QA_JSON: &str = r#"{
  "qa_pairs": [
    {"question": "battery life?", "answer": "10 hours", "product_name": "overall"},
    {"question": "Does the BZH support RTX 5090?", "answer": "No, the BZH ships with an RTX 5070 Ti.", "product_name": "BZH"}
  ]
}"#;
