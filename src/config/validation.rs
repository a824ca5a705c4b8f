//! Config validation: unknown-key detection with Levenshtein suggestions
//! and range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

use super::RagConfig;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `RagConfig`.
///
/// Maintained by hand; any new field added to `RagConfig` must be added here.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [data]
        "data",
        "data.catalog_path",
        "data.qa_path",
        // [retrieval]
        "retrieval",
        "retrieval.chunk_top_k",
        "retrieval.qa_top_k",
        "retrieval.keyword_weight",
        "retrieval.keyword_bonus_cap",
        "retrieval.full_specs_score_threshold",
        // [embedding]
        "embedding",
        "embedding.backend",
        "embedding.base_url",
        "embedding.model",
        "embedding.api_key",
        "embedding.timeout_secs",
        "embedding.max_retries",
        "embedding.hashing_dimensions",
        // [generation]
        "generation",
        "generation.base_url",
        "generation.model",
        "generation.api_key",
        "generation.temperature",
        "generation.max_tokens",
        "generation.context_length",
        "generation.timeout_secs",
        "generation.postprocess",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Levenshtein edit distance over chars.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Equal distances resolve to the lexicographically smaller key so the
/// suggestion does not depend on set iteration order.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Range checks on a parsed `RagConfig`.
///
/// Returns (errors, warnings): errors are values that must prevent startup;
/// warnings are legal but almost certainly unintended.
pub fn validate_ranges(config: &RagConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let r = &config.retrieval;

    // A cap below one token's weight means the bonus is constant for any overlap
    if r.keyword_bonus_cap > 0.0 && r.keyword_bonus_cap < r.keyword_weight {
        warnings.push(ValidationWarning {
            field: "retrieval.keyword_bonus_cap".to_string(),
            message: format!(
                "keyword_bonus_cap = {:.3} is below keyword_weight = {:.3}; any overlap earns the same bonus",
                r.keyword_bonus_cap, r.keyword_weight
            ),
            suggestion: None,
        });
    }

    // Hybrid scores live in [-1, 1 + cap]
    let max_score = 1.0 + r.keyword_bonus_cap;
    if r.full_specs_score_threshold >= max_score {
        warnings.push(ValidationWarning {
            field: "retrieval.full_specs_score_threshold".to_string(),
            message: format!(
                "full_specs_score_threshold = {:.2} is unreachable (max hybrid score {:.2}); Full-Specs chunks are never dropped",
                r.full_specs_score_threshold, max_score
            ),
            suggestion: None,
        });
    }
    if r.full_specs_score_threshold < -1.0 {
        errors.push(format!(
            "retrieval.full_specs_score_threshold = {:.2} is below the minimum cosine (-1.0)",
            r.full_specs_score_threshold
        ));
    }

    let g = &config.generation;
    if g.temperature > 2.0 {
        warnings.push(ValidationWarning {
            field: "generation.temperature".to_string(),
            message: format!(
                "temperature = {:.2} is outside the usual range (0-2)",
                g.temperature
            ),
            suggestion: None,
        });
    }
    if g.max_tokens as usize >= g.context_length {
        errors.push(format!(
            "generation.max_tokens ({}) must be smaller than context_length ({})",
            g.max_tokens, g.context_length
        ));
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
