//! Repository hosting errors

use thiserror::Error;

/// Error from the repository hosting API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GitHubError {
    /// Repository, branch or file does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Non-success response
    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Connection failure or timeout
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

impl GitHubError {
    /// Map a non-success status; `what` names the missing resource for 404
    pub fn from_status(status: u16, body: &str, what: &str) -> Self {
        if status == 404 {
            return GitHubError::NotFound(what.to_string());
        }
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or_else(|| body.chars().take(200).collect());
        GitHubError::Api { status, message }
    }

    /// Transport errors, 429 and 5xx are retried
    pub fn is_transient(&self) -> bool {
        match self {
            GitHubError::Transport(_) => true,
            GitHubError::Api { status, .. } => *status == 429 || *status >= 500,
            GitHubError::NotFound(_) | GitHubError::Decode(_) => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GitHubError::NotFound(_))
    }
}

impl From<reqwest::Error> for GitHubError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GitHubError::Decode(err.to_string())
        } else {
            GitHubError::Transport(err.to_string())
        }
    }
}
