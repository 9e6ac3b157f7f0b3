//! Error types for Sitewright Core
//!
//! Provides a unified error type for the task pipeline and its collaborators.

use thiserror::Error;

use crate::config::ConfigError;
use crate::github::GitHubError;
use crate::llm::GenerationError;
use crate::pipeline::PipelineError;

/// Result type for Sitewright Core operations
pub type Result<T> = std::result::Result<T, SitewrightError>;

/// Unified error type for Sitewright Core
#[derive(Error, Debug)]
pub enum SitewrightError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Every generation provider failed
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Repository hosting API error (retries exhausted or not retryable)
    #[error("Repository error: {0}")]
    Repository(#[from] GitHubError),

    /// Task pipeline could not be assembled or run
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Request violates an invariant (round range, repository name)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SitewrightError {
    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        SitewrightError::InvalidRequest(msg.into())
    }
}

impl From<serde_json::Error> for SitewrightError {
    fn from(err: serde_json::Error) -> Self {
        SitewrightError::Serialization(err.to_string())
    }
}
