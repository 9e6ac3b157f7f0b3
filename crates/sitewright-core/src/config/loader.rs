//! Configuration loader with environment variable expansion
//!
//! Loads `sitewright.toml` (if present), expands `${VAR}` references and then
//! applies direct environment overrides. Read once at startup.

use super::types::{AppConfig, LogFormat};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "sitewright.toml";

fn env_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex"))
}

/// Load configuration from the process environment
///
/// Priority order (later wins):
/// 1. Defaults
/// 2. `$SITEWRIGHT_CONFIG` or `./sitewright.toml`
/// 3. Environment variables
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let path = std::env::var("SITEWRIGHT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE));
    let env = |key: &str| std::env::var(key).ok();

    let config = if path.exists() {
        load_from_file(&path, &env)?
    } else {
        apply_env_overrides(AppConfig::default(), &env)
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from a specific file
pub fn load_from_file(
    path: &Path,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content, env)
}

/// Parse TOML content, then expand and override from `env`
pub fn parse_config(
    content: &str,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<AppConfig, ConfigError> {
    let mut config: AppConfig = toml::from_str(content)?;
    expand_env_vars(&mut config, env);
    Ok(apply_env_overrides(config, env))
}

/// Expand ${VAR} patterns in credential and URL values
fn expand_env_vars(config: &mut AppConfig, env: &dyn Fn(&str) -> Option<String>) {
    let fields = [
        &mut config.service.secret,
        &mut config.github.token,
        &mut config.github.owner,
        &mut config.llm.primary.api_key,
        &mut config.llm.primary.base_url,
        &mut config.llm.secondary.api_key,
        &mut config.llm.secondary.base_url,
    ];

    for field in fields {
        *field = expand_string(field, env);
    }
}

/// Expand environment variables in a single string
fn expand_string(s: &str, env: &dyn Fn(&str) -> Option<String>) -> String {
    env_regex()
        .replace_all(s, |caps: &regex::Captures| {
            let var_name = &caps[1];
            env(var_name).unwrap_or_else(|| format!("${{{}}}", var_name))
        })
        .to_string()
}

/// Apply environment variable overrides
///
/// Credentials use the conventional unprefixed names (`GITHUB_TOKEN`,
/// `LLM_API_KEY`, ...); service settings are prefixed with `SITEWRIGHT_`.
fn apply_env_overrides(mut config: AppConfig, env: &dyn Fn(&str) -> Option<String>) -> AppConfig {
    let get = |key: &str| env(key).filter(|v| !v.is_empty());

    if let Some(v) = get("SITEWRIGHT_SECRET") {
        config.service.secret = v;
    }
    if let Some(v) = get("SITEWRIGHT_HOST") {
        config.service.host = v;
    }
    if let Some(port) = get("SITEWRIGHT_PORT").and_then(|v| v.parse().ok()) {
        config.service.port = port;
    }

    if let Some(secs) = get("SITEWRIGHT_TASK_TIMEOUT").and_then(|v| v.parse().ok()) {
        config.task.timeout_secs = secs;
    }
    if let Some(secs) = get("SITEWRIGHT_CALLBACK_TIMEOUT").and_then(|v| v.parse().ok()) {
        config.task.callback_timeout_secs = secs;
    }

    // Primary chat-completions provider
    if let Some(v) = get("LLM_API_KEY") {
        config.llm.primary.api_key = v;
    }
    if let Some(v) = get("LLM_BASE_URL") {
        config.llm.primary.base_url = v;
    }
    if let Some(v) = get("LLM_MODEL") {
        config.llm.primary.model = v;
    }

    // Secondary inference provider
    if let Some(v) = get("INFERENCE_API_TOKEN") {
        config.llm.secondary.api_key = v;
    }
    if let Some(v) = get("INFERENCE_BASE_URL") {
        config.llm.secondary.base_url = v;
    }
    if let Some(v) = get("INFERENCE_MODEL") {
        config.llm.secondary.model = v;
    }

    if let Some(v) = get("GITHUB_TOKEN") {
        config.github.token = v;
    }
    if let Some(v) = get("GITHUB_OWNER") {
        config.github.owner = v;
    }

    if let Some(v) = get("SITEWRIGHT_LOG_LEVEL") {
        config.logging.level = v.to_lowercase();
    }
    if let Some(format) = get("SITEWRIGHT_LOG_FORMAT").and_then(|v| v.parse::<LogFormat>().ok()) {
        config.logging.format = format;
    }

    if let Some(v) = get("SITEWRIGHT_CODE_VALIDATION") {
        config.security.code_validation = matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
    }
    if let Some(len) = get("SITEWRIGHT_MAX_REPO_NAME_LENGTH").and_then(|v| v.parse().ok()) {
        config.security.max_repo_name_length = len;
    }
    if let Some(n) = get("SITEWRIGHT_MAX_RETRIES").and_then(|v| v.parse().ok()) {
        config.retry.max_attempts = n;
    }
    if let Some(f) = get("SITEWRIGHT_BACKOFF_FACTOR").and_then(|v| v.parse().ok()) {
        config.retry.backoff_factor = f;
    }

    config
}

impl AppConfig {
    /// Check required settings and value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.secret.trim().is_empty() {
            return Err(ConfigError::Missing("SITEWRIGHT_SECRET"));
        }
        if self.github.token.trim().is_empty() {
            return Err(ConfigError::Missing("GITHUB_TOKEN"));
        }
        if self.github.owner.trim().is_empty() {
            return Err(ConfigError::Missing("GITHUB_OWNER"));
        }

        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Invalid {
                key: "logging.level",
                value: self.logging.level.clone(),
            });
        }
        if self.task.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "task.timeout_secs",
                value: "0".to_string(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "retry.max_attempts",
                value: "0".to_string(),
            });
        }
        if !(self.retry.backoff_factor >= 1.0) {
            return Err(ConfigError::Invalid {
                key: "retry.backoff_factor",
                value: self.retry.backoff_factor.to_string(),
            });
        }
        Ok(())
    }
}

/// Create a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# Sitewright Configuration
# Place this file next to the binary as sitewright.toml,
# or point SITEWRIGHT_CONFIG at it.

[service]
secret = "${SITEWRIGHT_SECRET}"
host = "0.0.0.0"
port = 7860

[task]
timeout_secs = 570
callback_timeout_secs = 30

[llm.primary]
api_key = "${LLM_API_KEY}"
base_url = "https://aipipe.org/openai/v1"
model = "openai/gpt-4o-mini"

[llm.secondary]
api_key = "${INFERENCE_API_TOKEN}"
base_url = "https://api-inference.huggingface.co/models"
model = "meta-llama/Llama-3.2-3B-Instruct"

[github]
token = "${GITHUB_TOKEN}"
owner = "${GITHUB_OWNER}"

[logging]
level = "info"
format = "json"

[security]
code_validation = true
max_repo_name_length = 100

[retry]
max_attempts = 5
backoff_factor = 2.0
"#
}
