//! Intent router - rule-based retrieval mode selection
//!
//! Rules are evaluated top to bottom and the first match wins:
//!
//! 1. **Comparison**: any comparison keyword
//! 2. **SpecificProduct**: a product model can be extracted
//! 3. **ProductList**: any product-listing keyword
//! 4. **General**: everything else
//!
//! Keyword checks are case-insensitive substring tests over English and
//! Traditional Chinese vocabulary.

use serde::{Serialize, Serializer};
use tracing::debug;

use super::product_extractor::ProductNameExtractor;

/// Comparison intent.
///
/// Excludes "產品", which also occurs in product-list questions ("有哪些產品").
pub const COMPARISON_KEYWORDS: &[&str] = &[
    "比較", "差異", "差別", "不同", "compare", "comparison", "difference", "vs", "versus",
];

/// "Which products exist" intent.
pub const PRODUCT_LIST_KEYWORDS: &[&str] = &[
    "有哪些產品",
    "甚麼產品",
    "什麼產品",
    "what products",
    "list products",
    "available models",
    "所有產品",
    "all products",
    "有哪幾台",
    "有哪幾款",
];

/// Generic spec vocabulary. Advisory only; does not affect the mode.
pub const GENERAL_SPEC_KEYWORDS: &[&str] = &[
    "規格",
    "specs",
    "specifications",
    "spec",
    "配置",
    "筆電",
    "laptop",
    "電腦",
    "computer",
    "這台",
    "這款",
];

fn contains_any(query: &str, keywords: &[&str]) -> bool {
    let lower = query.to_lowercase();
    keywords.iter().any(|k| lower.contains(&k.to_lowercase()))
}

/// Retrieval strategy chosen for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalMode {
    /// Skip search; return every Full-Specs chunk.
    Comparison,
    /// Search only the named product's chunks.
    SpecificProduct(String),
    /// Inject the product list as a fact, then search everything.
    ProductList,
    /// Search everything.
    General,
}

impl RetrievalMode {
    pub fn name(&self) -> &'static str {
        match self {
            RetrievalMode::Comparison => "comparison",
            RetrievalMode::SpecificProduct(_) => "specific_product",
            RetrievalMode::ProductList => "product_list",
            RetrievalMode::General => "general",
        }
    }
}

impl std::fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrievalMode::SpecificProduct(id) => write!(f, "specific_product({id})"),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Serialized as its display form, e.g. `"specific_product(aorus-master-16-bxh)"`.
impl Serialize for RetrievalMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Routing decision for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub mode: RetrievalMode,
    /// Extracted product id, independent of the chosen mode.
    pub product_id: Option<String>,
    /// Query mentions generic spec vocabulary.
    pub general_spec: bool,
}

/// Stateless classifier over raw query text.
#[derive(Debug, Clone)]
pub struct IntentRouter {
    extractor: ProductNameExtractor,
}

impl IntentRouter {
    pub fn new(extractor: ProductNameExtractor) -> Self {
        Self { extractor }
    }

    pub fn extractor(&self) -> &ProductNameExtractor {
        &self.extractor
    }

    pub fn is_comparison_query(query: &str) -> bool {
        contains_any(query, COMPARISON_KEYWORDS)
    }

    pub fn is_product_list_query(query: &str) -> bool {
        contains_any(query, PRODUCT_LIST_KEYWORDS)
    }

    pub fn is_general_spec_query(query: &str) -> bool {
        contains_any(query, GENERAL_SPEC_KEYWORDS)
    }

    /// Classify `query`.
    pub fn route(&self, query: &str) -> Route {
        let product_id = self.extractor.extract(query);

        let mode = if Self::is_comparison_query(query) {
            RetrievalMode::Comparison
        } else if let Some(id) = &product_id {
            RetrievalMode::SpecificProduct(id.clone())
        } else if Self::is_product_list_query(query) {
            RetrievalMode::ProductList
        } else {
            RetrievalMode::General
        };

        let route = Route {
            mode,
            product_id,
            general_spec: Self::is_general_spec_query(query),
        };
        debug!(mode = %route.mode, product = ?route.product_id, "Routed query");
        route
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductRef;

    fn router() -> IntentRouter {
        IntentRouter::new(ProductNameExtractor::from_products(vec![
            ProductRef::new("aorus-master-16-bxh", "AORUS MASTER 16 BXH"),
            ProductRef::new("aorus-master-16-byh", "AORUS MASTER 16 BYH"),
        ]))
    }

    #[test]
    fn test_comparison_beats_product() {
        let r = router().route("Compare BXH and BYH");
        assert_eq!(r.mode, RetrievalMode::Comparison);
        assert_eq!(r.product_id.as_deref(), Some("aorus-master-16-bxh"));
    }

    #[test]
    fn test_chinese_comparison() {
        assert_eq!(router().route("BXH 跟 BYH 有什麼差異").mode, RetrievalMode::Comparison);
    }

    #[test]
    fn test_specific_product() {
        let r = router().route("What CPU does the BYH have?");
        assert_eq!(
            r.mode,
            RetrievalMode::SpecificProduct("aorus-master-16-byh".to_string())
        );
    }

    #[test]
    fn test_product_before_list() {
        let r = router().route("list products like BXH");
        assert!(matches!(r.mode, RetrievalMode::SpecificProduct(_)));
    }

    #[test]
    fn test_product_list() {
        assert_eq!(router().route("What products do you have?").mode, RetrievalMode::ProductList);
        assert_eq!(router().route("你們有哪些產品").mode, RetrievalMode::ProductList);
    }

    #[test]
    fn test_general() {
        let r = router().route("How heavy is the laptop?");
        assert_eq!(r.mode, RetrievalMode::General);
        assert!(r.general_spec);
        assert!(!router().route("How heavy is it?").general_spec);
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(RetrievalMode::General.to_string(), "general");
        assert_eq!(
            RetrievalMode::SpecificProduct("p1".to_string()).to_string(),
            "specific_product(p1)"
        );
    }

    #[test]
    fn test_product_word_alone_is_not_comparison() {
        assert!(!COMPARISON_KEYWORDS.contains(&"產品"));
        assert!(!IntentRouter::is_comparison_query("所有產品"));
        assert!(IntentRouter::is_comparison_query("比較這兩款產品"));
    }

    #[test]
    fn test_route_serializes_mode_as_string() {
        let json = serde_json::to_value(router().route("What GPU does the BYH have?")).unwrap();
        assert_eq!(json["mode"], "specific_product(aorus-master-16-byh)");
        assert_eq!(json["product_id"], "aorus-master-16-byh");
        assert_eq!(json["general_spec"], false);
    }
}
