//! Product record → chunk conversion

use crate::types::{Chunk, ChunkMetadata, ProductRecord, FULL_SPECS_CATEGORY, FULL_SPECS_KEY};

/// Canonical spec groups and the search terms appended to matching chunks.
///
/// Checked in order; the first group with a keyword contained in the row's
/// category or key wins.
pub const CANONICAL_KEYWORD_GROUPS: &[(&str, &[&str])] = &[
    ("gpu", &["GPU", "Graphics", "gaming", "顯卡", "顯示卡", "遊戲"]),
    ("cpu", &["CPU", "Processor", "中央處理器", "處理器"]),
    ("ram", &["RAM", "Memory", "記憶體"]),
    ("ssd", &["SSD", "Storage", "儲存裝置", "硬碟"]),
    ("display", &["Screen", "Display", "HDMI", "DP", "顯示器", "螢幕"]),
    ("battery", &["Battery", "電池"]),
    (
        "ports",
        &["Ports", "Connectivity", "連接埠", "I/O", "USB", "Thunderbolt", "HDMI"],
    ),
    ("wireless", &["Wireless", "Networking", "通訊", "WiFi"]),
    ("audio", &["Audio", "Speakers", "音效", "喇叭"]),
    ("dimensions", &["Dimensions", "Physical", "尺寸"]),
    ("weight", &["Weight", "Physical", "重量"]),
];

/// Hint line appended to every Full-Specs chunk.
pub const FULL_SPECS_RELATED_TERMS: &str = "Related terms: specifications, full specs, configuration, computer, laptop, overall, 規格, 整機規格, 配置, 筆電, 電腦";

/// `Related words: …` line for a spec row, if it belongs to a canonical group.
pub fn related_words(category: &str, key: &str) -> Option<String> {
    let terms = [category.to_lowercase(), key.to_lowercase()];
    CANONICAL_KEYWORD_GROUPS
        .iter()
        .find(|(_, keywords)| {
            keywords.iter().any(|kw| {
                let kw = kw.to_lowercase();
                terms.iter().any(|t| t.contains(&kw))
            })
        })
        .map(|(_, keywords)| format!("Related words: {}", keywords.join("、")))
}

/// All chunks for one product: spec rows first, Full-Specs rollup last.
pub(super) fn product_chunks(product: &ProductRecord) -> Vec<Chunk> {
    let mut chunks = Vec::with_capacity(product.specs.len() + 1);

    for spec in &product.specs {
        let mut lines = vec![
            format!("Product: {}", product.product_name),
            format!("Category: {}", spec.category),
            format!("Specification: {}", spec.key),
            format!("Value: {}", spec.value),
        ];
        if let Some(hint) = related_words(&spec.category, &spec.key) {
            lines.push(hint);
        }
        chunks.push(Chunk {
            content: lines.join("\n"),
            metadata: metadata(product, &spec.category, &spec.key),
        });
    }

    let body = product
        .specs
        .iter()
        .map(|s| format!("- {} - {}: {}", s.category, s.key, s.value.replace('\n', " ")))
        .collect::<Vec<_>>()
        .join("\n");

    let full = [
        format!("Product: {}", product.product_name),
        format!("Category: {FULL_SPECS_CATEGORY}"),
        format!("Specification: {FULL_SPECS_KEY}"),
        "Value:".to_string(),
        body,
        FULL_SPECS_RELATED_TERMS.to_string(),
    ];
    chunks.push(Chunk {
        content: full.join("\n"),
        metadata: metadata(product, FULL_SPECS_CATEGORY, FULL_SPECS_KEY),
    });

    chunks
}

fn metadata(product: &ProductRecord, category: &str, key: &str) -> ChunkMetadata {
    ChunkMetadata {
        product_id: product.product_id.clone(),
        product_name: product.product_name.clone(),
        category: category.to_string(),
        key: key.to_string(),
    }
}
