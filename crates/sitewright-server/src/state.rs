//! Server state management

use sitewright_core::{AppConfig, SharedSecret, TaskPipeline};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<TaskPipeline>,
    pub secret: SharedSecret,
    /// Longest accepted task id
    pub max_repo_name_length: usize,
}

impl AppState {
    pub fn new(pipeline: TaskPipeline, secret: &str, max_repo_name_length: usize) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            secret: SharedSecret::new(secret),
            max_repo_name_length,
        }
    }

    /// Build the real pipeline from configuration
    pub fn from_config(config: &AppConfig) -> sitewright_core::Result<Self> {
        let pipeline = TaskPipeline::from_config(config)?;
        Ok(Self::new(
            pipeline,
            &config.service.secret,
            config.security.max_repo_name_length,
        ))
    }
}
