//! System-wide default constants.
//!
//! Every tunable in `RagConfig` falls back to one of these. Grouped by
//! subsystem for easy discovery.

// ============================================================================
// Config Discovery
// ============================================================================

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "SPEC_RAG_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "rag_config.toml";

// ============================================================================
// Data
// ============================================================================

/// Ingested product catalog (fatal if missing).
pub const CATALOG_PATH: &str = "data/knowledge_base/specs_integrated.json";

/// Curated QA dataset (optional).
pub const QA_PATH: &str = "data/knowledge_base/qa_dataset.json";

/// Results file for `--batch` when `--output` is not given.
pub const BATCH_OUTPUT_PATH: &str = "results/batch_results.csv";

// ============================================================================
// Retrieval
// ============================================================================

/// Chunks returned from a hybrid search.
pub const CHUNK_TOP_K: usize = 5;

/// QA pairs returned per query.
pub const QA_TOP_K: usize = 1;

/// Hybrid bonus per overlapping query token.
pub const KEYWORD_WEIGHT: f32 = 0.05;

/// Maximum total keyword bonus.
pub const KEYWORD_BONUS_CAP: f32 = 0.5;

/// Top hybrid score above which Full-Specs chunks are dropped.
///
/// Cosine tops out at 1.0, so only a keyword-boosted hit can exceed it.
pub const FULL_SPECS_SCORE_THRESHOLD: f32 = 1.2;

// ============================================================================
// Embedding
// ============================================================================

/// OpenAI-compatible server root (llama.cpp `--embedding`, Ollama, ...).
pub const EMBEDDING_BASE_URL: &str = "http://127.0.0.1:8081/v1";

pub const EMBEDDING_MODEL: &str = "Qwen3-Embedding-0.6B";

/// Per-request HTTP timeout (seconds).
pub const EMBEDDING_TIMEOUT_SECS: u64 = 30;

/// Attempts per text before an embedding failure surfaces.
pub const EMBEDDING_MAX_RETRIES: usize = 3;

/// Output width of the offline hashing embedder.
pub const HASHING_DIMENSIONS: usize = 384;

// ============================================================================
// Generation
// ============================================================================

pub const GENERATION_BASE_URL: &str = "http://127.0.0.1:8080/v1";

pub const GENERATION_MODEL: &str = "gemma-3-4b-it";

pub const GENERATION_TEMPERATURE: f32 = 0.7;

pub const GENERATION_MAX_TOKENS: u32 = 512;

/// Model context window (tokens). Used to warn about oversized prompts.
pub const GENERATION_CONTEXT_LENGTH: usize = 4096;

/// Streaming generations can run long on CPU-only servers.
pub const GENERATION_TIMEOUT_SECS: u64 = 300;

/// Rough characters-per-token ratio for prompt size estimates.
pub const CHARS_PER_TOKEN_ESTIMATE: usize = 4;
