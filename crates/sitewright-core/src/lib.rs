//! Sitewright Core - Backend library for Sitewright
//!
//! This crate provides the transport-agnostic task machinery:
//! - LLM generation providers with ordered fallback
//! - GitHub repository management (create, diff-aware commit, pages)
//! - The task pipeline and callback delivery
//! - Configuration loading, retry, security and validation helpers
//!
//! Any front end (the HTTP server, a CLI, tests) drives it through
//! [`TaskPipeline`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐ TaskRequest ┌──────────────┐ generate ┌───────────────┐
//! │ HTTP server │ ──────────→ │ TaskPipeline │ ───────→ │ ProviderChain │
//! └─────────────┘             │              │ commit   ├───────────────┤
//!                             │              │ ───────→ │ RepoManager   │
//!                             │              │ report   ├───────────────┤
//!                             │              │ ───────→ │ Callback      │
//!                             └──────────────┘          └───────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sitewright_core::{load_config, TaskPipeline};
//!
//! let config = load_config()?;
//! let pipeline = TaskPipeline::from_config(&config)?;
//! let outcome = pipeline.run(request).await;
//! ```

// Public API modules
pub mod error;
pub mod models;

// Backend modules
pub mod config;
pub mod retry;
pub mod security;
pub mod validation;

// LLM provider system
pub mod llm;

// Repository hosting
pub mod github;

// Task orchestration
pub mod pipeline;

// Fakes for tests and downstream crates
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export commonly used types
pub use error::{Result, SitewrightError};
pub use models::{Attachment, EvaluationResult, TaskRequest, TaskResponse};

// Re-export config types
pub use config::{load_config, AppConfig, ConfigError, LogFormat, LoggingConfig};

// Re-export LLM types
pub use llm::{
    ChatCompletionsProvider, GenerationError, GenerationProvider, GenerationRequest,
    GenerationResponse, InferenceProvider, LlmError, ProviderChain, SharedProvider,
};

// Re-export repository types
pub use github::{GitHubClient, GitHubError, RepoApi, RepoInfo, RepoManager};

// Re-export pipeline types
pub use pipeline::{CallbackNotifier, DeliveryReport, PipelineError, TaskOutcome, TaskPipeline};

pub use retry::{exponential_backoff, retry_async, retry_blocking, RetryPolicy};
pub use security::SharedSecret;

/// Get the crate version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
