//! Wire types for inbound task requests and outbound evaluation reports

use crate::error::{Result, SitewrightError};
use crate::validation::is_valid_repo_name;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attachment carried inline as a data URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    /// `data:<mime>;base64,<payload>` or a percent-encoded data URI
    pub url: String,
}

impl Attachment {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// MIME type declared in the data URI header, or `unknown`
    pub fn mime_type(&self) -> &str {
        self.url
            .strip_prefix("data:")
            .and_then(|rest| rest.split([';', ',']).next())
            .filter(|mime| !mime.is_empty())
            .unwrap_or("unknown")
    }
}

/// A task as submitted to `POST /api-endpoint`
#[derive(Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    pub email: String,
    pub secret: String,
    /// Task identifier, also used as the repository name
    pub task: String,
    /// 1, 2 or 3
    pub round: u8,
    /// Echoed back in the evaluation result
    pub nonce: String,
    pub brief: String,
    #[serde(default)]
    pub checks: Vec<String>,
    pub evaluation_url: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl fmt::Debug for TaskRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRequest")
            .field("email", &self.email)
            .field("secret", &"***")
            .field("task", &self.task)
            .field("round", &self.round)
            .field("nonce", &self.nonce)
            .field("brief", &self.brief)
            .field("checks", &self.checks)
            .field("evaluation_url", &self.evaluation_url)
            .field("attachments", &self.attachments.len())
            .finish()
    }
}

impl TaskRequest {
    /// Check the request invariants: round range, repository-safe task id,
    /// and an http(s) callback URL
    pub fn validate(&self, max_repo_name_length: usize) -> Result<()> {
        if !(1..=3).contains(&self.round) {
            return Err(SitewrightError::invalid_request(format!(
                "round must be 1, 2 or 3 (got {})",
                self.round
            )));
        }

        if !is_valid_repo_name(&self.task, max_repo_name_length) {
            return Err(SitewrightError::invalid_request(format!(
                "task '{}' is not a valid repository name",
                self.task
            )));
        }

        match reqwest::Url::parse(&self.evaluation_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(SitewrightError::invalid_request(format!(
                    "evaluation_url '{}' is not an http(s) URL",
                    self.evaluation_url
                )))
            }
        }

        if !self.email.contains('@') {
            return Err(SitewrightError::invalid_request("email is not valid"));
        }

        Ok(())
    }
}

/// Immediate acknowledgment returned to the submitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub status: String,
    pub message: String,
}

impl TaskResponse {
    pub fn accepted() -> Self {
        Self {
            status: "accepted".to_string(),
            message: "Request received, processing".to_string(),
        }
    }
}

/// Report POSTed to the request's `evaluation_url`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub email: String,
    pub task: String,
    pub round: u8,
    pub nonce: String,
    pub repo_url: String,
    pub commit_sha: String,
    pub pages_url: String,
}
