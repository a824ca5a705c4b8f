//! RAG Configuration - retrieval, embedding, and generation settings as TOML
//!
//! Each section implements `Default` with the values in [`super::defaults`],
//! so a missing file or a partial file behaves exactly like the built-in
//! setup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;
use crate::embedding::HttpEmbedderConfig;
use crate::llm::HttpGeneratorConfig;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one assistant deployment.
///
/// Load with `RagConfig::load()` which searches:
/// 1. `$SPEC_RAG_CONFIG` env var
/// 2. `./rag_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagConfig {
    /// Catalog and QA dataset locations
    #[serde(default)]
    pub data: DataConfig,

    /// Search sizes and hybrid scoring constants
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Embedding backend
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Answer generation backend
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl RagConfig {
    /// Load configuration using the standard search order:
    /// 1. `$SPEC_RAG_CONFIG` environment variable
    /// 2. `./rag_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded RAG config from {}", defaults::CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", defaults::CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", defaults::CONFIG_ENV_VAR);
            }
        }

        // 2. Check ./rag_config.toml
        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded RAG config from ./{}", defaults::LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", defaults::LOCAL_CONFIG_FILE);
                }
            }
        }

        // 3. Defaults
        info!("No {} found, using built-in defaults", defaults::LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Toml(err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        // Two-pass: check for unknown keys first (warnings only)
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the config to `path`, e.g. to produce a starter file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "RAG config saved");
        Ok(())
    }

    /// Reject values no deployment can run with.
    ///
    /// Rules:
    /// - Top-k sizes and output widths must be > 0
    /// - Keyword weight must be >= 0, bonus cap > 0
    /// - Every float must be finite
    /// - Paths, URLs, and model names must be non-empty where used
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.data.catalog_path.as_os_str().is_empty() {
            errors.push("data.catalog_path must not be empty".to_string());
        }
        if self.data.qa_path.as_os_str().is_empty() {
            errors.push("data.qa_path must not be empty".to_string());
        }

        let r = &self.retrieval;
        if r.chunk_top_k == 0 {
            errors.push("retrieval.chunk_top_k must be > 0".to_string());
        }
        if r.qa_top_k == 0 {
            errors.push("retrieval.qa_top_k must be > 0".to_string());
        }
        Self::check_finite(r.keyword_weight, "retrieval.keyword_weight", &mut errors);
        Self::check_finite(r.keyword_bonus_cap, "retrieval.keyword_bonus_cap", &mut errors);
        Self::check_finite(
            r.full_specs_score_threshold,
            "retrieval.full_specs_score_threshold",
            &mut errors,
        );
        if r.keyword_weight < 0.0 {
            errors.push(format!(
                "retrieval.keyword_weight = {:.3} cannot be negative",
                r.keyword_weight
            ));
        }
        if r.keyword_bonus_cap <= 0.0 {
            errors.push(format!(
                "retrieval.keyword_bonus_cap = {:.3} must be > 0",
                r.keyword_bonus_cap
            ));
        }

        let e = &self.embedding;
        match e.backend {
            EmbeddingBackend::Http => {
                if e.base_url.trim().is_empty() {
                    errors.push("embedding.base_url must not be empty for the http backend".to_string());
                }
                if e.model.trim().is_empty() {
                    errors.push("embedding.model must not be empty for the http backend".to_string());
                }
            }
            EmbeddingBackend::Hashing => {
                if e.hashing_dimensions == 0 {
                    errors.push("embedding.hashing_dimensions must be > 0".to_string());
                }
            }
        }

        let g = &self.generation;
        Self::check_finite(g.temperature, "generation.temperature", &mut errors);
        if g.temperature < 0.0 {
            errors.push(format!(
                "generation.temperature = {:.2} cannot be negative",
                g.temperature
            ));
        }
        if g.max_tokens == 0 {
            errors.push("generation.max_tokens must be > 0".to_string());
        }
        if g.context_length == 0 {
            errors.push("generation.context_length must be > 0".to_string());
        }

        let (range_errors, range_warnings) = super::validation::validate_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_finite(value: f32, name: &str, errors: &mut Vec<String>) {
        if !value.is_finite() {
            errors.push(format!("{name} must be a finite number (got {value})"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Data
// ============================================================================

/// Input file locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Product catalog JSON. Loading failure is fatal.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// QA dataset JSON. Missing or malformed files degrade to no QA.
    #[serde(default = "default_qa_path")]
    pub qa_path: PathBuf,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from(defaults::CATALOG_PATH)
}
fn default_qa_path() -> PathBuf {
    PathBuf::from(defaults::QA_PATH)
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            qa_path: default_qa_path(),
        }
    }
}

// ============================================================================
// Retrieval
// ============================================================================

/// Search sizes and hybrid-scoring constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_chunk_top_k")]
    pub chunk_top_k: usize,

    #[serde(default = "default_qa_top_k")]
    pub qa_top_k: usize,

    /// Bonus per query token found in a chunk
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,

    /// Upper bound on the keyword bonus
    #[serde(default = "default_keyword_bonus_cap")]
    pub keyword_bonus_cap: f32,

    /// Top score above which Full-Specs chunks are dropped
    #[serde(default = "default_full_specs_score_threshold")]
    pub full_specs_score_threshold: f32,
}

fn default_chunk_top_k() -> usize {
    defaults::CHUNK_TOP_K
}

fn default_qa_top_k() -> usize {
    defaults::QA_TOP_K
}

fn default_keyword_weight() -> f32 {
    defaults::KEYWORD_WEIGHT
}

fn default_keyword_bonus_cap() -> f32 {
    defaults::KEYWORD_BONUS_CAP
}

fn default_full_specs_score_threshold() -> f32 {
    defaults::FULL_SPECS_SCORE_THRESHOLD
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_top_k: default_chunk_top_k(),
            qa_top_k: default_qa_top_k(),
            keyword_weight: default_keyword_weight(),
            keyword_bonus_cap: default_keyword_bonus_cap(),
            full_specs_score_threshold: default_full_specs_score_threshold(),
        }
    }
}

// ============================================================================
// Embedding
// ============================================================================

/// Which embedder implementation to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// OpenAI-compatible `/embeddings` endpoint
    #[default]
    Http,
    /// Offline feature-hashing embedder
    Hashing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,

    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Bearer token, if the server wants one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_embedding_max_retries")]
    pub max_retries: usize,

    /// Output width of the hashing backend
    #[serde(default = "default_hashing_dimensions")]
    pub hashing_dimensions: usize,
}

fn default_embedding_base_url() -> String {
    defaults::EMBEDDING_BASE_URL.to_string()
}

fn default_embedding_model() -> String {
    defaults::EMBEDDING_MODEL.to_string()
}

fn default_embedding_timeout_secs() -> u64 {
    defaults::EMBEDDING_TIMEOUT_SECS
}

fn default_embedding_max_retries() -> usize {
    defaults::EMBEDDING_MAX_RETRIES
}

fn default_hashing_dimensions() -> usize {
    defaults::HASHING_DIMENSIONS
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            api_key: None,
            timeout_secs: default_embedding_timeout_secs(),
            max_retries: default_embedding_max_retries(),
            hashing_dimensions: default_hashing_dimensions(),
        }
    }
}

impl EmbeddingConfig {
    pub fn http_config(&self) -> HttpEmbedderConfig {
        HttpEmbedderConfig {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
        }
    }
}

// ============================================================================
// Generation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_base_url")]
    pub base_url: String,

    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Model context window in tokens
    #[serde(default = "default_context_length")]
    pub context_length: usize,

    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,

    /// Apply answer clean-up (score stripping, fallback normalization)
    #[serde(default)]
    pub postprocess: bool,
}

fn default_generation_base_url() -> String {
    defaults::GENERATION_BASE_URL.to_string()
}

fn default_generation_model() -> String {
    defaults::GENERATION_MODEL.to_string()
}

fn default_temperature() -> f32 {
    defaults::GENERATION_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    defaults::GENERATION_MAX_TOKENS
}

fn default_context_length() -> usize {
    defaults::GENERATION_CONTEXT_LENGTH
}

fn default_generation_timeout_secs() -> u64 {
    defaults::GENERATION_TIMEOUT_SECS
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_generation_base_url(),
            model: default_generation_model(),
            api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            context_length: default_context_length(),
            timeout_secs: default_generation_timeout_secs(),
            postprocess: false,
        }
    }
}

impl GenerationConfig {
    pub fn http_config(&self) -> HttpGeneratorConfig {
        HttpGeneratorConfig {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
