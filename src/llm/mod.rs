//! LLM Backend Module
//!
//! Answer generation for the spec assistant.
//!
//! ## Architecture
//!
//! - **Generator**: `(system prompt, user prompt) → TokenStream`, a lazy
//!   iterator of text fragments. Dropping the stream cancels generation.
//! - **HttpGenerator**: OpenAI-compatible `/chat/completions` client with
//!   server-sent-event streaming (llama.cpp server, Ollama, hosted APIs)
//! - **prompts**: system prompt, user prompt template, fallback answers
//! - **postprocess**: rule-based clean-up of finished answers

use thiserror::Error;

pub mod http;
pub mod postprocess;
pub mod prompts;

pub use http::{HttpGenerator, HttpGeneratorConfig};
pub use postprocess::postprocess_answer;
pub use prompts::{build_user_prompt, FALLBACK_RESPONSE_EN, FALLBACK_RESPONSE_ZH, SYSTEM_PROMPT};

/// Lazy, finite sequence of generated text fragments.
///
/// Not resumable: a fresh `generate` call starts a new generation.
pub type TokenStream = Box<dyn Iterator<Item = Result<String, GenerationError>> + Send>;

/// Errors raised by generation backends.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Generation backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed stream event: {0}")]
    Stream(String),

    #[error("Stream read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generator misconfigured: {0}")]
    Config(String),
}

/// Unified trait for generation backends.
pub trait Generator: Send + Sync {
    /// Start generating a reply. Fragments arrive as the stream is consumed.
    fn generate(&self, system_prompt: &str, user_prompt: &str)
        -> Result<TokenStream, GenerationError>;

    /// Get the backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Drain a stream into one string, stopping at the first error.
pub fn collect_stream(stream: TokenStream) -> Result<String, GenerationError> {
    stream.collect()
}
