//! Delivery of evaluation results to the submitter's callback URL

use super::PipelineError;
use crate::models::EvaluationResult;
use crate::retry::RetryPolicy;
use std::time::Duration;
use tracing::{error, info, warn};

/// Delivery attempts before giving up
pub const CALLBACK_ATTEMPTS: u32 = 5;

/// Outcome of a delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: bool,
    pub attempts: u32,
    /// Delays slept between attempts
    pub delays: Vec<Duration>,
}

/// POSTs an [`EvaluationResult`] until the receiver answers 200.
///
/// Delays double from `base_delay` (1s, 2s, 4s, 8s with the defaults).
pub struct CallbackNotifier {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl CallbackNotifier {
    /// Notifier with a per-request timeout and the default schedule
    pub fn new(timeout: Duration) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Client(e.to_string()))?;
        Ok(Self {
            client,
            policy: RetryPolicy::new(CALLBACK_ATTEMPTS)
                .with_max_delay(Duration::from_secs(60))
                .without_jitter(),
        })
    }

    pub fn with_base_delay(mut self, base: Duration) -> Self {
        self.policy.base_delay = base;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.policy.max_attempts = attempts;
        self
    }

    /// Delays slept between attempts if every attempt fails
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.policy.max_attempts.saturating_sub(1))
            .map(|attempt| self.policy.delay_for(attempt))
            .collect()
    }

    pub async fn deliver(&self, url: &str, result: &EvaluationResult) -> DeliveryReport {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut delays = Vec::new();
        info!(url, "posting evaluation result");

        for attempt in 0..max_attempts {
            match self.client.post(url).json(result).send().await {
                Ok(response) if response.status() == reqwest::StatusCode::OK => {
                    info!(attempts = attempt + 1, "evaluation result delivered");
                    return DeliveryReport {
                        delivered: true,
                        attempts: attempt + 1,
                        delays,
                    };
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body: String = response
                        .text()
                        .await
                        .unwrap_or_default()
                        .chars()
                        .take(100)
                        .collect();
                    warn!(attempt = attempt + 1, status, body = %body, "callback rejected");
                }
                Err(err) => warn!(attempt = attempt + 1, error = %err, "callback request failed"),
            }

            if attempt + 1 < max_attempts {
                let delay = self.policy.delay_for(attempt);
                delays.push(delay);
                tokio::time::sleep(delay).await;
            }
        }

        error!(attempts = max_attempts, "failed to deliver evaluation result");
        DeliveryReport {
            delivered: false,
            attempts: max_attempts,
            delays,
        }
    }
}
