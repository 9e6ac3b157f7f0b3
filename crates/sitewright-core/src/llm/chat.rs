//! OpenAI-compatible chat completions provider
//!
//! Walks a preference-ordered model list and never fails: when every model
//! is exhausted the response is synthesised locally.

use super::fallback::{complete_response, fallback_response};
use super::prompts::{system_prompt, user_prompt};
use super::provider::{GenerationProvider, GenerationRequest, GenerationResponse};
use super::{GenerationError, LlmError};
use crate::config::ProviderConfig;
use crate::retry::{retry_async, RetryPolicy};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Models tried after the configured one, in order
pub const KNOWN_MODELS: [&str; 5] = [
    "openai/gpt-4-turbo",
    "openai/gpt-4o-mini",
    "anthropic/claude-3-5-sonnet",
    "google/gemini-pro-1.5",
    "meta-llama/llama-3.1-70b-instruct",
];

/// Distinct models tried per request
pub const MAX_MODELS: usize = 3;

/// Attempts per model
pub const ATTEMPTS_PER_MODEL: u32 = 2;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Chat completions provider (`POST {base_url}/chat/completions`)
pub struct ChatCompletionsProvider {
    client: reqwest::Client,

    /// Bearer token
    api_key: String,

    /// Base URL, without trailing slash
    base_url: String,

    /// Preferred model
    model: String,

    /// Retry policy applied per model
    retry: RetryPolicy,
}

impl ChatCompletionsProvider {
    /// Create a new provider with a per-request timeout
    pub fn new(api_key: &str, base_url: &str, model: &str, timeout: Duration) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        if !KNOWN_MODELS.contains(&model) {
            warn!(model, "model is not in the known list, trying it anyway");
        }
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            retry: RetryPolicy::new(ATTEMPTS_PER_MODEL),
        })
    }

    /// Create from provider configuration
    pub fn from_config(config: &ProviderConfig, timeout: Duration) -> Result<Self, LlmError> {
        Self::new(&config.api_key, &config.base_url, &config.model, timeout)
    }

    /// Replace the per-model retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Configured model first, then the known models, capped at [`MAX_MODELS`]
    pub fn candidate_models(&self) -> Vec<String> {
        let mut models = vec![self.model.clone()];
        for known in KNOWN_MODELS {
            if models.len() >= MAX_MODELS {
                break;
            }
            if !models.iter().any(|m| m == known) {
                models.push(known.to_string());
            }
        }
        models
    }

    async fn complete(&self, model: &str, user: &str) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": model,
            "messages": [
                {"role": "system", "content": system_prompt()},
                {"role": "user", "content": user}
            ],
            "temperature": 0.7,
            "max_tokens": 4000
        });

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status.as_u16(), text));
        }

        let json: serde_json::Value = response.json().await?;
        let content = json
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(LlmError::InvalidResponse("Empty response".to_string()));
        }
        Ok(content.to_string())
    }
}

#[async_trait]
impl GenerationProvider for ChatCompletionsProvider {
    fn id(&self) -> &str {
        "chat"
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, GenerationError> {
        let started = Instant::now();
        let user = user_prompt(request);

        for model in self.candidate_models() {
            info!(model = %model, "generating with chat model");
            let result = retry_async(&self.retry, "chat_completion", LlmError::is_transient, || {
                self.complete(&model, &user)
            })
            .await;

            match result {
                Ok(content) => {
                    info!(model = %model, "generation succeeded");
                    return Ok(complete_response(&content, request, &model, started.elapsed()));
                }
                Err(err) => warn!(model = %model, error = %err, "chat model failed"),
            }
        }

        error!("all chat models failed, using fallback content");
        Ok(fallback_response(request, started.elapsed()))
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/models", self.base_url);
        match self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::serve;
    use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(ATTEMPTS_PER_MODEL)
            .with_base_delay(Duration::from_millis(1))
            .without_jitter()
    }

    fn provider(base_url: &str, model: &str) -> ChatCompletionsProvider {
        ChatCompletionsProvider::new("test-key", base_url, model, Duration::from_secs(5))
            .unwrap()
            .with_retry_policy(fast_retry())
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
    }

    #[test]
    fn test_candidate_models() {
        let p = provider("http://localhost", "custom/model");
        assert_eq!(
            p.candidate_models(),
            vec!["custom/model", "openai/gpt-4-turbo", "openai/gpt-4o-mini"]
        );

        let p = provider("http://localhost", "openai/gpt-4o-mini");
        assert_eq!(
            p.candidate_models(),
            vec!["openai/gpt-4o-mini", "openai/gpt-4-turbo", "anthropic/claude-3-5-sonnet"]
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_falls_back_locally() {
        let p = provider("http://127.0.0.1:9", "openai/gpt-4o-mini");
        let request = GenerationRequest {
            brief: "A click counter".to_string(),
            checks: vec!["#count-btn increments the counter".to_string()],
            round: 1,
            ..Default::default()
        };

        let response = p.generate(&request).await.unwrap();

        assert_eq!(response.model_used, "fallback");
        assert!(response.index_html.contains(r#"<button id="count-btn""#));
        assert!(response.readme_md.contains("A click counter"));
        assert!(response.license_text.starts_with("MIT License"));
    }

    #[tokio::test]
    async fn test_successful_completion_is_parsed() {
        let app = Router::new().route(
            "/chat/completions",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["temperature"], 0.7);
                assert_eq!(body["max_tokens"], 4000);
                assert_eq!(body["messages"][0]["role"], "system");
                Json(completion(
                    "=== index.html ===\n<p id=\"x\">ok</p>\n=== README.md ===\n# Ok\n=== style.css ===\np {}",
                ))
            }),
        );
        let base = serve(app).await;

        let response = provider(&base, "openai/gpt-4o-mini")
            .generate(&GenerationRequest::default())
            .await
            .unwrap();

        assert_eq!(response.model_used, "openai/gpt-4o-mini");
        assert_eq!(response.index_html, "<p id=\"x\">ok</p>");
        assert_eq!(response.readme_md, "# Ok");
        assert!(response.license_text.starts_with("MIT License"));
        assert_eq!(response.additional_files["style.css"], "p {}");
    }

    #[tokio::test]
    async fn test_failing_model_moves_to_next() {
        let calls = Arc::new(AtomicU32::new(0));
        let app = Router::new()
            .route(
                "/chat/completions",
                post(
                    |State(calls): State<Arc<AtomicU32>>, Json(body): Json<serde_json::Value>| async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        if body["model"] == "broken/model" {
                            (StatusCode::SERVICE_UNAVAILABLE, Json(serde_json::json!({})))
                        } else {
                            (StatusCode::OK, Json(completion("=== index.html ===\n<p>second</p>")))
                        }
                    },
                ),
            )
            .with_state(calls.clone());
        let base = serve(app).await;

        let response = provider(&base, "broken/model")
            .generate(&GenerationRequest::default())
            .await
            .unwrap();

        assert_eq!(response.model_used, "openai/gpt-4-turbo");
        assert_eq!(response.index_html, "<p>second</p>");
        // two attempts on the broken model, one on the next
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_content_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let app = Router::new()
            .route(
                "/chat/completions",
                post(|State(calls): State<Arc<AtomicU32>>| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Json(completion(""))
                }),
            )
            .with_state(calls.clone());
        let base = serve(app).await;

        let response = provider(&base, "openai/gpt-4o-mini")
            .generate(&GenerationRequest::default())
            .await
            .unwrap();

        assert!(response.is_fallback());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_MODELS as u32);
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = Router::new().route("/models", get(|| async { Json(serde_json::json!({"data": []})) }));
        let base = serve(app).await;
        assert!(provider(&base, "m").health_check().await);
        assert!(!provider("http://127.0.0.1:9", "m").health_check().await);
    }
}
