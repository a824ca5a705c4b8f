//! Feature-hashing embedder
//!
//! Buckets lower-cased terms into a fixed number of dimensions with FNV-1a and
//! weights them by term frequency. Not semantically rich, but deterministic and
//! always available, which makes it the offline backend and the test backend.

use std::collections::HashMap;

use super::{Embedder, EmbeddingError};

/// Default vector width for the hashing backend.
pub const DEFAULT_HASHING_DIMENSIONS: usize = 384;

/// Deterministic bag-of-words embedder.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSIONS)
    }
}

impl HashingEmbedder {
    /// Create an embedder producing `dimensions`-wide vectors (minimum 1).
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn bucket(term: &str, dims: usize) -> usize {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        for b in term.as_bytes() {
            h ^= u64::from(*b);
            h = h.wrapping_mul(0x0100_0000_01b3);
        }
        #[allow(clippy::cast_possible_truncation)]
        let idx = (h % dims as u64) as usize;
        idx
    }

    /// Lower-cased alphanumeric terms. CJK runs split into single characters
    /// since they carry no whitespace boundaries.
    fn tokenize(text: &str) -> Vec<String> {
        let mut terms = Vec::new();
        for word in text.split(|c: char| !c.is_alphanumeric()) {
            if word.is_empty() {
                continue;
            }
            if word.chars().any(is_cjk) {
                terms.extend(word.chars().map(|c| c.to_lowercase().collect::<String>()));
            } else {
                terms.push(word.to_lowercase());
            }
        }
        terms
    }
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c) || ('\u{3400}'..='\u{4dbf}').contains(&c)
}

impl Embedder for HashingEmbedder {
    #[allow(clippy::cast_precision_loss)]
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let terms = Self::tokenize(text);
        let mut vec = vec![0.0f32; self.dimensions];
        if terms.is_empty() {
            return Ok(vec);
        }

        let mut tf: HashMap<&str, f32> = HashMap::new();
        for t in &terms {
            *tf.entry(t.as_str()).or_default() += 1.0;
        }

        let total = terms.len() as f32;
        for (term, count) in tf {
            let idf = 1.0 + (term.chars().count() as f32).ln();
            vec[Self::bucket(term, self.dimensions)] += (count / total) * idf;
        }

        Ok(vec)
    }

    fn name(&self) -> &'static str {
        "hashing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{dot, normalize};

    #[test]
    fn test_empty_text_is_zero_vector() {
        let e = HashingEmbedder::new(64);
        let v = e.embed("").unwrap();
        assert_eq!(v.len(), 64);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_deterministic() {
        let e = HashingEmbedder::new(128);
        assert_eq!(e.embed("RTX 4090 Laptop GPU").unwrap(), e.embed("RTX 4090 Laptop GPU").unwrap());
    }

    #[test]
    fn test_case_insensitive() {
        let e = HashingEmbedder::new(128);
        assert_eq!(e.embed("Thunderbolt").unwrap(), e.embed("thunderbolt").unwrap());
    }

    #[test]
    fn test_cjk_characters_are_terms() {
        let terms = HashingEmbedder::tokenize("顯示卡 GPU");
        assert_eq!(terms, vec!["顯", "示", "卡", "gpu"]);
    }

    #[test]
    fn test_related_texts_score_higher() {
        let e = HashingEmbedder::new(256);
        let a = normalize(&e.embed("graphics gpu nvidia geforce").unwrap()).unwrap();
        let b = normalize(&e.embed("which gpu graphics card").unwrap()).unwrap();
        let c = normalize(&e.embed("battery capacity wh").unwrap()).unwrap();
        assert!(dot(&a, &b) > dot(&a, &c));
    }

    #[test]
    fn test_zero_dimensions_clamped() {
        assert_eq!(HashingEmbedder::new(0).dimensions(), 1);
    }
}
