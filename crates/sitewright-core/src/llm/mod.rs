//! Content generation
//!
//! Turns a brief into the files of a static site.
//!
//! Providers:
//! - Chat completions (OpenAI-compatible gateway, several models)
//! - Hosted inference endpoint (single model)
//!
//! Both parse `=== filename ===` output and fill any missing mandatory file
//! by local synthesis.

mod chat;
mod error;
pub mod fallback;
mod inference;
pub mod parser;
pub mod prompts;
mod provider;
mod registry;

pub use error::{GenerationError, LlmError};
pub use provider::{
    GenerationProvider, GenerationRequest, GenerationResponse, SharedProvider, INDEX_FILE,
    LICENSE_FILE, MANDATORY_FILES, README_FILE,
};
pub use registry::ProviderChain;

// Provider implementations
pub use chat::{ChatCompletionsProvider, ATTEMPTS_PER_MODEL, KNOWN_MODELS, MAX_MODELS};
pub use inference::InferenceProvider;
