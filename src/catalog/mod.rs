//! Product Catalog Module
//!
//! Loads the ingested product-spec JSON and turns it into indexable chunks.
//!
//! ## Chunk layout
//!
//! For every product, in catalog order:
//! 1. One chunk per spec row (`Product / Category / Specification / Value`),
//!    with a `Related words:` hint line when the row belongs to a canonical
//!    keyword group, so exact-term queries hit it.
//! 2. One Full-Specs rollup listing every spec row of the product.
//!
//! A missing or malformed catalog is fatal: the engine has nothing to
//! retrieve without it.

mod chunker;

pub use chunker::{related_words, CANONICAL_KEYWORD_GROUPS, FULL_SPECS_RELATED_TERMS};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::types::{CatalogFile, Chunk, ProductRecord, ProductRef};

/// Errors loading the primary product catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Catalog parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("Catalog parse error: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Read-only product catalog.
#[derive(Debug, Clone, Default)]
pub struct SpecCatalog {
    products: Vec<ProductRecord>,
}

impl SpecCatalog {
    pub fn new(products: Vec<ProductRecord>) -> Self {
        Self { products }
    }

    /// Load a catalog file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| CatalogError::Io(path.to_path_buf(), e))?;
        let file: CatalogFile = serde_json::from_str(&contents)
            .map_err(|e| CatalogError::Parse(path.to_path_buf(), e))?;
        info!(
            path = %path.display(),
            products = file.products.len(),
            "Loaded product catalog"
        );
        Ok(Self::new(file.products))
    }

    /// Parse a catalog from an in-memory JSON document.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Ok(Self::new(file.products))
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Full product records in catalog order.
    pub fn records(&self) -> &[ProductRecord] {
        &self.products
    }

    /// `(product_id, product_name)` pairs in catalog order.
    pub fn products(&self) -> Vec<ProductRef> {
        self.products
            .iter()
            .map(|p| ProductRef::new(p.product_id.clone(), p.product_name.clone()))
            .collect()
    }

    pub fn product(&self, product_id: &str) -> Option<&ProductRecord> {
        self.products.iter().find(|p| p.product_id == product_id)
    }

    /// Flattened spec lookup for one product.
    ///
    /// Keys are lower-cased; each row is stored both as `key` and as
    /// `category key`. Later rows overwrite earlier ones sharing a key.
    pub fn product_specs(&self, product_id: &str) -> HashMap<String, String> {
        let mut specs = HashMap::new();
        let Some(product) = self.product(product_id) else {
            return specs;
        };
        for spec in &product.specs {
            let key = spec.key.to_lowercase();
            let category = spec.category.to_lowercase();
            specs.insert(format!("{category} {key}"), spec.value.clone());
            specs.insert(key, spec.value.clone());
        }
        specs
    }

    /// Convert every product into spec chunks followed by its Full-Specs chunk.
    pub fn chunks(&self) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = self.products.iter().flat_map(chunker::product_chunks).collect();
        info!(
            products = self.products.len(),
            chunks = chunks.len(),
            "Chunked product catalog"
        );
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "version": "2.1",
        "products": [
            {
                "product_id": "aorus-master-16-bxh",
                "product_name": "AORUS MASTER 16 BXH",
                "specs": [
                    {"category": "Processor", "key": "CPU", "value": "Intel Core Ultra 9 275HX"},
                    {"category": "Graphics", "key": "GPU", "value": "NVIDIA GeForce RTX 5080"}
                ]
            },
            {
                "product_id": "aorus-master-16-byh",
                "product_name": "AORUS MASTER 16 BYH",
                "specs": [
                    {"category": "Processor", "key": "CPU", "value": "Intel Core Ultra 9 275HX"}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_chunk_count_includes_one_full_specs_per_product() {
        let catalog = SpecCatalog::from_json(SAMPLE).unwrap();
        let chunks = catalog.chunks();
        assert_eq!(chunks.len(), 2 + 1 + 1 + 1);
        assert_eq!(chunks.iter().filter(|c| c.is_full_specs()).count(), 2);
        assert!(chunks[2].is_full_specs());
        assert_eq!(chunks[2].product_id(), "aorus-master-16-bxh");
    }

    #[test]
    fn test_products_in_order() {
        let catalog = SpecCatalog::from_json(SAMPLE).unwrap();
        let products = catalog.products();
        assert_eq!(products.len(), 2);
        assert_eq!(products[1].product_name, "AORUS MASTER 16 BYH");
    }

    #[test]
    fn test_product_specs_flattened() {
        let catalog = SpecCatalog::from_json(SAMPLE).unwrap();
        let specs = catalog.product_specs("aorus-master-16-bxh");
        assert_eq!(specs.get("gpu").map(String::as_str), Some("NVIDIA GeForce RTX 5080"));
        assert_eq!(
            specs.get("processor cpu").map(String::as_str),
            Some("Intel Core Ultra 9 275HX")
        );
        assert!(catalog.product_specs("missing").is_empty());
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let catalog = SpecCatalog::from_json(r#"{"products":[{"specs":[{"value":"x"}]}]}"#).unwrap();
        let p = &catalog.records()[0];
        assert_eq!(p.product_id, "unknown");
        assert_eq!(p.product_name, "Unknown Product");
        assert_eq!(p.specs[0].category, "");
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let err = SpecCatalog::load(Path::new("/nonexistent/specs.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Io(_, _)));
    }

    #[test]
    fn test_load_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("specs.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = SpecCatalog::load(&path).unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_, _)));
    }
}
