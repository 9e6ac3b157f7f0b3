//! LLM error types

use std::fmt;

/// Error from a single call to a remote LLM endpoint
#[derive(Debug, Clone)]
pub enum LlmError {
    /// Network/connection error
    Connection(String),

    /// API error (authentication, bad request, server error)
    Api { status: u16, message: String },

    /// Request timeout
    Timeout,

    /// Rate limited
    RateLimited,

    /// Response arrived but carried no usable text
    InvalidResponse(String),

    /// Client could not be constructed
    Misconfiguration(String),
}

impl LlmError {
    /// Build an error from a non-success HTTP status and body
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            429 => LlmError::RateLimited,
            401 | 403 => LlmError::Api {
                status,
                message: "Authentication failed".to_string(),
            },
            _ => LlmError::Api {
                status,
                message: truncate(&body, 200),
            },
        }
    }

    /// Transport failures, timeouts, 429 and 5xx are worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Connection(_) | LlmError::Timeout | LlmError::RateLimited => true,
            LlmError::Api { status, .. } => *status >= 500,
            LlmError::InvalidResponse(_) | LlmError::Misconfiguration(_) => false,
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Api { status, .. } => Some(*status),
            LlmError::RateLimited => Some(429),
            _ => None,
        }
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::Connection(msg) => write!(f, "Connection error: {}", msg),
            LlmError::Api { status, message } => write!(f, "API error ({}): {}", status, message),
            LlmError::Timeout => write!(f, "Request timed out"),
            LlmError::RateLimited => write!(f, "Rate limited"),
            LlmError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            LlmError::Misconfiguration(msg) => write!(f, "Misconfiguration: {}", msg),
        }
    }
}

impl std::error::Error for LlmError {}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else if let Some(status) = err.status() {
            LlmError::from_status(status.as_u16(), err.to_string())
        } else if err.is_decode() {
            LlmError::InvalidResponse(err.to_string())
        } else if err.is_builder() {
            LlmError::Misconfiguration(err.to_string())
        } else {
            LlmError::Connection(err.to_string())
        }
    }
}

/// No usable content could be produced by a provider
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[{provider}/{model}] {message}")]
pub struct GenerationError {
    pub provider: String,
    pub model: String,
    pub message: String,
}

impl GenerationError {
    pub fn new(provider: impl Into<String>, model: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            message: message.into(),
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
