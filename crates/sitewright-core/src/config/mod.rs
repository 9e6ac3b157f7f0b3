//! Configuration module for Sitewright
//!
//! Handles loading of `sitewright.toml` and environment overrides. The
//! resulting [`AppConfig`] is read-only after startup and injected into the
//! components that need it.

mod loader;
mod types;

pub use loader::{load_config, load_from_file, parse_config, sample_config, ConfigError, CONFIG_FILE};
pub use types::{
    AppConfig, GitHubConfig, LlmConfig, LogFormat, LoggingConfig, ProviderConfig, RetryConfig,
    SecurityConfig, ServiceConfig, TaskConfig,
};
