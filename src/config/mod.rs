//! RAG Configuration Module
//!
//! Retrieval, embedding, and generation settings loaded from TOML, with every
//! empirically chosen constant exposed as a tunable value.
//!
//! ## Loading Order
//!
//! 1. `SPEC_RAG_CONFIG` environment variable (path to TOML file)
//! 2. `rag_config.toml` in the current working directory
//! 3. Built-in defaults (see [`defaults`])
//!
//! ## Usage
//!
//! The loaded config is passed explicitly to the components that need it;
//! there is no global instance.
//!
//! ```ignore
//! let config = RagConfig::load();
//! let rag = RagSystem::build(&config)?;
//! ```

mod rag_config;
pub mod defaults;
pub mod validation;

pub use rag_config::*;
