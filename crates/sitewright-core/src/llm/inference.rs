//! Hosted text-generation inference provider (`POST {base_url}/{model}`)

use super::fallback::complete_response;
use super::prompts::{system_prompt, user_prompt};
use super::provider::{GenerationProvider, GenerationRequest, GenerationResponse};
use super::{GenerationError, LlmError};
use crate::config::ProviderConfig;
use crate::retry::{retry_async, RetryPolicy};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{error, info};

const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Inference endpoint provider. Fails with [`GenerationError`] once retries
/// are exhausted so the caller can move on.
pub struct InferenceProvider {
    client: reqwest::Client,

    /// Bearer token; omitted from requests when empty
    api_token: String,

    /// `{base_url}/{model}`
    endpoint: String,

    model: String,

    retry: RetryPolicy,
}

impl InferenceProvider {
    /// Create a new provider with a per-request timeout
    pub fn new(api_token: &str, base_url: &str, model: &str, timeout: Duration) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_token: api_token.to_string(),
            endpoint: format!("{}/{}", base_url.trim_end_matches('/'), model),
            model: model.to_string(),
            retry: RetryPolicy::new(super::chat::ATTEMPTS_PER_MODEL),
        })
    }

    /// Create from provider configuration
    pub fn from_config(config: &ProviderConfig, timeout: Duration) -> Result<Self, LlmError> {
        Self::new(&config.api_key, &config.base_url, &config.model, timeout)
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_token.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.api_token)
        }
    }

    async fn infer(&self, prompt: &str) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": 4000,
                "temperature": 0.7,
                "top_p": 0.95,
                "do_sample": true,
                "return_full_text": false
            }
        });

        let response = self
            .authorize(self.client.post(&self.endpoint))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status.as_u16(), text));
        }

        let json: serde_json::Value = response.json().await?;
        let content = extract_generated_text(&json);
        if content.trim().is_empty() {
            return Err(LlmError::InvalidResponse("Empty response".to_string()));
        }
        Ok(content)
    }
}

/// Generated text from `[0].generated_text`, `generated_text` or `text`
fn extract_generated_text(json: &serde_json::Value) -> String {
    let field = match json {
        serde_json::Value::Array(items) => items.first().and_then(|item| item.get("generated_text")),
        serde_json::Value::Object(_) => json
            .get("generated_text")
            .filter(|v| v.as_str().is_some_and(|s| !s.is_empty()))
            .or_else(|| json.get("text")),
        _ => None,
    };
    field
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl GenerationProvider for InferenceProvider {
    fn id(&self) -> &str {
        "inference"
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, GenerationError> {
        let started = Instant::now();
        let prompt = format!("{}\n\n{}", system_prompt(), user_prompt(request));
        info!(model = %self.model, "generating with inference endpoint");

        let content = retry_async(&self.retry, "inference", LlmError::is_transient, || {
            self.infer(&prompt)
        })
        .await
        .map_err(|err| {
            error!(model = %self.model, error = %err, "inference failed");
            let message = match err.status() {
                Some(503) => "Model is loading, try again later".to_string(),
                _ => format!("Request failed: {}", err),
            };
            GenerationError::new(self.id(), &self.model, message)
        })?;

        Ok(complete_response(&content, request, &self.model, started.elapsed()))
    }

    async fn health_check(&self) -> bool {
        match self
            .authorize(self.client.get(&self.endpoint))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => matches!(response.status().as_u16(), 200 | 503),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::serve;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    const MODEL: &str = "org/small-model";

    fn provider(base_url: &str) -> InferenceProvider {
        InferenceProvider::new("", base_url, MODEL, Duration::from_secs(5))
            .unwrap()
            .with_retry_policy(
                RetryPolicy::new(2)
                    .with_base_delay(Duration::from_millis(1))
                    .without_jitter(),
            )
    }

    #[test]
    fn test_extract_generated_text_shapes() {
        let list = serde_json::json!([{"generated_text": "a"}]);
        let object = serde_json::json!({"generated_text": "b"});
        let text = serde_json::json!({"text": "c"});
        let other = serde_json::json!(42);

        assert_eq!(extract_generated_text(&list), "a");
        assert_eq!(extract_generated_text(&object), "b");
        assert_eq!(extract_generated_text(&text), "c");
        assert_eq!(extract_generated_text(&other), "");
    }

    #[tokio::test]
    async fn test_generates_from_list_response() {
        let app = Router::new().route(
            "/org/small-model",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["parameters"]["return_full_text"], false);
                Json(serde_json::json!([{
                    "generated_text": "=== index.html ===\n<p>hi</p>\n=== extra.js ===\n1;"
                }]))
            }),
        );
        let base = serve(app).await;

        let response = provider(&base).generate(&GenerationRequest::default()).await.unwrap();
        assert_eq!(response.model_used, MODEL);
        assert_eq!(response.index_html, "<p>hi</p>");
        assert_eq!(response.additional_files["extra.js"], "1;");
    }

    #[tokio::test]
    async fn test_model_loading_fails_after_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let app = Router::new()
            .route(
                "/org/small-model",
                post(|State(calls): State<Arc<AtomicU32>>| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::SERVICE_UNAVAILABLE, "loading")
                }),
            )
            .with_state(calls.clone());
        let base = serve(app).await;

        let err = provider(&base).generate(&GenerationRequest::default()).await.unwrap_err();
        assert_eq!(err.provider, "inference");
        assert_eq!(err.model, MODEL);
        assert!(err.message.contains("loading"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let app = Router::new()
            .route(
                "/org/small-model",
                post(|State(calls): State<Arc<AtomicU32>>| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::BAD_REQUEST, "bad input")
                }),
            )
            .with_state(calls.clone());
        let base = serve(app).await;

        let err = provider(&base).generate(&GenerationRequest::default()).await.unwrap_err();
        assert!(err.to_string().starts_with("[inference/org/small-model]"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_health_accepts_loading() {
        let app = Router::new().route(
            "/org/small-model",
            axum::routing::get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
        let base = serve(app).await;
        assert!(provider(&base).health_check().await);
    }
}
