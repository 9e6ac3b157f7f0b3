//! Pipeline error types

use crate::github::GitHubError;
use crate::llm::GenerationError;
use thiserror::Error;

/// A failure that ends a task before its result can be reported
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Every provider failed
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Repository could not be created or committed to
    #[error("Repository operation failed: {0}")]
    Repository(#[from] GitHubError),

    /// An HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(String),
}
