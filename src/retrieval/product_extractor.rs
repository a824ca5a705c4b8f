//! Product model extraction from free-text queries.
//!
//! A product is identified by its model suffix: the last `-`-separated segment
//! of its id, upper-cased (`aorus-master-16-bxh` → `BXH`). A query mentions the
//! product if the suffix occurs anywhere in the upper-cased query. The first
//! matching product in catalog order wins.

use crate::types::ProductRef;

/// Model suffixes used when no catalog was supplied.
pub const FALLBACK_SUFFIXES: &[&str] = &["BXH", "BYH", "BZH"];

/// Upper-cased last `-` segment of a product id.
pub fn product_suffix(product_id: &str) -> String {
    product_id
        .rsplit('-')
        .next()
        .unwrap_or(product_id)
        .to_uppercase()
}

/// Source of known products, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductCatalog {
    /// Products loaded from the catalog file.
    Dynamic(Vec<ProductRef>),
    /// Hard-coded model suffixes; extraction returns the suffix itself.
    Fallback(&'static [&'static str]),
}

impl ProductCatalog {
    /// `Dynamic` for a non-empty list, `Fallback` otherwise.
    pub fn from_products(products: Vec<ProductRef>) -> Self {
        if products.is_empty() {
            Self::Fallback(FALLBACK_SUFFIXES)
        } else {
            Self::Dynamic(products)
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    /// Display names of every known product, in order.
    pub fn product_names(&self) -> Vec<String> {
        match self {
            Self::Dynamic(products) => products.iter().map(|p| p.product_name.clone()).collect(),
            Self::Fallback(suffixes) => suffixes.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Suffix-containment product matcher.
#[derive(Debug, Clone)]
pub struct ProductNameExtractor {
    catalog: ProductCatalog,
}

impl ProductNameExtractor {
    pub fn new(catalog: ProductCatalog) -> Self {
        Self { catalog }
    }

    pub fn from_products(products: Vec<ProductRef>) -> Self {
        Self::new(ProductCatalog::from_products(products))
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    /// Product id mentioned in `query`, if any.
    ///
    /// Products whose suffix is empty (id ending in `-`) never match.
    pub fn extract(&self, query: &str) -> Option<String> {
        let upper = query.to_uppercase();
        match &self.catalog {
            ProductCatalog::Dynamic(products) => products
                .iter()
                .find(|p| {
                    let suffix = product_suffix(&p.product_id);
                    !suffix.is_empty() && upper.contains(&suffix)
                })
                .map(|p| p.product_id.clone()),
            ProductCatalog::Fallback(suffixes) => suffixes
                .iter()
                .find(|s| upper.contains(*s))
                .map(|s| (*s).to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> ProductNameExtractor {
        ProductNameExtractor::from_products(vec![
            ProductRef::new("aorus-master-16-bxh", "AORUS MASTER 16 BXH"),
            ProductRef::new("aorus-master-16-byh", "AORUS MASTER 16 BYH"),
            ProductRef::new("aorus-master-16-bzh", "AORUS MASTER 16 BZH"),
        ])
    }

    #[test]
    fn test_suffix() {
        assert_eq!(product_suffix("aorus-master-16-bxh"), "BXH");
        assert_eq!(product_suffix("p1"), "P1");
        assert_eq!(product_suffix("trailing-"), "");
    }

    #[test]
    fn test_extract_case_insensitive_substring() {
        let e = extractor();
        assert_eq!(e.extract("what gpu does the byh have").as_deref(), Some("aorus-master-16-byh"));
        assert_eq!(e.extract("BZH的電池容量").as_deref(), Some("aorus-master-16-bzh"));
        assert_eq!(e.extract("which laptop is lightest"), None);
    }

    #[test]
    fn test_first_catalog_match_wins() {
        let e = extractor();
        assert_eq!(e.extract("BYH or BXH?").as_deref(), Some("aorus-master-16-bxh"));
    }

    #[test]
    fn test_fallback_returns_suffix() {
        let e = ProductNameExtractor::from_products(Vec::new());
        assert!(e.catalog().is_fallback());
        assert_eq!(e.extract("tell me about bzh").as_deref(), Some("BZH"));
        assert_eq!(e.extract("nothing here"), None);
    }

    #[test]
    fn test_empty_suffix_never_matches() {
        let e = ProductNameExtractor::from_products(vec![ProductRef::new("broken-", "Broken")]);
        assert_eq!(e.extract("anything at all"), None);
    }

    #[test]
    fn test_product_names() {
        assert_eq!(extractor().catalog().product_names()[0], "AORUS MASTER 16 BXH");
        assert_eq!(
            ProductCatalog::from_products(Vec::new()).product_names(),
            vec!["BXH", "BYH", "BZH"]
        );
    }
}
