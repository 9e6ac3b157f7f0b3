//! Configuration types for Sitewright
//!
//! Defines the structure of `sitewright.toml`. Every section has defaults so a
//! partial file (or none at all, with environment overrides) is enough.

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP service settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Per-task deadlines and callback delivery
    #[serde(default)]
    pub task: TaskConfig,

    /// LLM providers, in fallback order
    #[serde(default)]
    pub llm: LlmConfig,

    /// Repository hosting account
    #[serde(default)]
    pub github: GitHubConfig,

    /// Log verbosity and format
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Validation toggles and limits
    #[serde(default)]
    pub security: SecurityConfig,

    /// Shared retry defaults
    #[serde(default)]
    pub retry: RetryConfig,
}

/// HTTP service section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Shared secret callers must present (supports ${ENV_VAR} syntax)
    #[serde(default)]
    pub secret: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    7860
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Task section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Overall deadline for one task, in seconds
    #[serde(default = "default_task_timeout")]
    pub timeout_secs: u64,

    /// Timeout for a single callback POST, in seconds
    #[serde(default = "default_callback_timeout")]
    pub callback_timeout_secs: u64,
}

fn default_task_timeout() -> u64 {
    570
}

fn default_callback_timeout() -> u64 {
    30
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_task_timeout(),
            callback_timeout_secs: default_callback_timeout(),
        }
    }
}

impl TaskConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.callback_timeout_secs)
    }
}

/// LLM configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Chat-completions provider, tried first
    #[serde(default = "default_primary")]
    pub primary: ProviderConfig,

    /// Single-prompt inference provider, tried when the primary fails
    #[serde(default = "default_secondary")]
    pub secondary: ProviderConfig,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout: u64,
}

fn default_llm_timeout() -> u64 {
    120
}

fn default_primary() -> ProviderConfig {
    ProviderConfig {
        enabled: true,
        api_key: String::new(),
        base_url: "https://aipipe.org/openai/v1".to_string(),
        model: "openai/gpt-4o-mini".to_string(),
    }
}

fn default_secondary() -> ProviderConfig {
    ProviderConfig {
        enabled: true,
        api_key: String::new(),
        base_url: "https://api-inference.huggingface.co/models".to_string(),
        model: "meta-llama/Llama-3.2-3B-Instruct".to_string(),
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            secondary: default_secondary(),
            timeout: default_llm_timeout(),
        }
    }
}

/// Individual provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Whether this provider takes part in the fallback chain
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// API key (supports ${ENV_VAR} syntax)
    #[serde(default)]
    pub api_key: String,

    /// Base URL for the API
    pub base_url: String,

    /// Model for this provider
    pub model: String,
}

fn default_enabled() -> bool {
    true
}

/// GitHub section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Personal access token (supports ${ENV_VAR} syntax)
    #[serde(default)]
    pub token: String,

    /// Account that owns the generated repositories
    #[serde(default)]
    pub owner: String,

    /// API root, overridable for GitHub Enterprise
    #[serde(default)]
    pub api_url: Option<String>,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" | "pretty" | "plain" => Ok(LogFormat::Text),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logging section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Json
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Security section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Scan generated files for dangerous patterns before committing
    #[serde(default = "default_enabled")]
    pub code_validation: bool,

    #[serde(default = "default_max_repo_name_length")]
    pub max_repo_name_length: usize,
}

fn default_max_repo_name_length() -> usize {
    100
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            code_validation: true,
            max_repo_name_length: default_max_repo_name_length(),
        }
    }
}

/// Retry section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Upper bound on the attempts of every retried operation
    #[serde(default = "default_max_retries")]
    pub max_attempts: u32,

    /// Multiplier applied to the backoff delay after each attempt
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

fn default_max_retries() -> u32 {
    5
}

fn default_backoff_factor() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_retries(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

impl RetryConfig {
    /// Policy for an operation tried `attempts` times, capped by `max_attempts`
    pub fn policy(&self, attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts.min(self.max_attempts)).with_factor(self.backoff_factor)
    }
}

impl AppConfig {
    /// Address the HTTP service binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.service.host, self.service.port)
    }
}
