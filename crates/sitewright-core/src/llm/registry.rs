//! Ordered fallback chain of generation providers

use super::chat::{ChatCompletionsProvider, ATTEMPTS_PER_MODEL};
use super::inference::InferenceProvider;
use super::provider::{GenerationRequest, GenerationResponse, SharedProvider};
use super::{GenerationError, LlmError};
use crate::config::{LlmConfig, RetryConfig};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Providers tried in order until one produces content
#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<SharedProvider>,
}

impl ProviderChain {
    /// Create a chain from providers in preference order
    pub fn new(providers: Vec<SharedProvider>) -> Self {
        Self { providers }
    }

    /// Build the chain from configuration: the chat provider first, then the
    /// inference provider, skipping disabled ones
    pub fn from_config(llm: &LlmConfig, retry: &RetryConfig) -> Result<Self, LlmError> {
        let timeout = Duration::from_secs(llm.timeout);
        let policy = retry.policy(ATTEMPTS_PER_MODEL);
        let mut providers: Vec<SharedProvider> = Vec::new();

        if llm.primary.enabled {
            let chat = ChatCompletionsProvider::from_config(&llm.primary, timeout)?
                .with_retry_policy(policy.clone());
            providers.push(Arc::new(chat));
        }
        if llm.secondary.enabled {
            let inference = InferenceProvider::from_config(&llm.secondary, timeout)?
                .with_retry_policy(policy);
            providers.push(Arc::new(inference));
        }

        Ok(Self::new(providers))
    }

    /// Add a provider at the end of the chain
    pub fn push(&mut self, provider: SharedProvider) {
        self.providers.push(provider);
    }

    /// Get a provider by ID
    pub fn get(&self, id: &str) -> Option<SharedProvider> {
        self.providers.iter().find(|p| p.id() == id).cloned()
    }

    /// Provider IDs in order
    pub fn ids(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.id().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Try each provider in order; the first success wins
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, GenerationError> {
        let mut last_error = None;

        for provider in &self.providers {
            match provider.generate(request).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    warn!(provider = provider.id(), error = %err, "provider failed, trying next");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| GenerationError::new("none", "none", "No providers configured")))
    }

    /// Reachability of every provider, keyed by ID
    pub async fn health(&self) -> BTreeMap<String, bool> {
        let mut status = BTreeMap::new();
        for provider in &self.providers {
            status.insert(provider.id().to_string(), provider.health_check().await);
        }
        status
    }
}
