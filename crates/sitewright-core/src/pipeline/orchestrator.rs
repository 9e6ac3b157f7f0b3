//! The task pipeline: generate, commit, publish, report

use super::attachments::decode_attachments;
use super::callback::{CallbackNotifier, DeliveryReport};
use super::PipelineError;
use crate::config::AppConfig;
use crate::github::{GitHubClient, RepoManager, RepoPolicies, DEFAULT_BRANCH};
use crate::llm::{GenerationRequest, ProviderChain, INDEX_FILE};
use crate::models::{EvaluationResult, TaskRequest};
use crate::validation::{sanitize_description, scan_code_safety};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, warn, Instrument};

/// Longest repository description
const DESCRIPTION_MAX_CHARS: usize = 100;

/// Characters of the brief used in the commit message
const COMMIT_BRIEF_CHARS: usize = 50;

/// Default per-task deadline
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(570);

/// How a pipeline run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Result delivered to the callback URL
    Reported { attempts: u32 },
    /// Work committed but the callback never accepted the result
    Unreported { attempts: u32 },
    /// A step failed before anything could be reported
    Failed(String),
    /// The deadline expired; nothing was reported
    TimedOut,
}

/// Runs tasks end to end. Shared read-only between spawned tasks.
pub struct TaskPipeline {
    providers: ProviderChain,
    repos: RepoManager,
    notifier: CallbackNotifier,
    timeout: Duration,
    code_validation: bool,
}

impl TaskPipeline {
    pub fn new(providers: ProviderChain, repos: RepoManager, notifier: CallbackNotifier) -> Self {
        Self {
            providers,
            repos,
            notifier,
            timeout: DEFAULT_TASK_TIMEOUT,
            code_validation: true,
        }
    }

    /// Wire the real providers, GitHub client and notifier from configuration
    pub fn from_config(config: &AppConfig) -> crate::Result<Self> {
        let providers = ProviderChain::from_config(&config.llm, &config.retry)
            .map_err(|e| PipelineError::Client(e.to_string()))?;
        let github = GitHubClient::from_config(&config.github)?;
        let repos = RepoManager::new(Arc::new(github))
            .with_policies(RepoPolicies::from_config(&config.retry));
        let notifier = CallbackNotifier::new(config.task.callback_timeout())?;

        Ok(Self::new(providers, repos, notifier)
            .with_timeout(config.task.timeout())
            .with_code_validation(config.security.code_validation))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_code_validation(mut self, enabled: bool) -> Self {
        self.code_validation = enabled;
        self
    }

    /// Providers in fallback order
    pub fn providers(&self) -> &ProviderChain {
        &self.providers
    }

    pub fn notifier(&self) -> &CallbackNotifier {
        &self.notifier
    }

    /// Run one task under the deadline
    pub async fn run(&self, request: TaskRequest) -> TaskOutcome {
        let span = info_span!("task", task = %request.task, round = request.round);

        async move {
            let started = Instant::now();
            info!(email = %request.email, "starting task");

            let outcome = match tokio::time::timeout(self.timeout, self.process(&request)).await {
                Ok(Ok(report)) if report.delivered => TaskOutcome::Reported {
                    attempts: report.attempts,
                },
                Ok(Ok(report)) => TaskOutcome::Unreported {
                    attempts: report.attempts,
                },
                Ok(Err(err)) => {
                    error!(error = %err, "task failed");
                    TaskOutcome::Failed(err.to_string())
                }
                Err(_) => {
                    error!(timeout_secs = self.timeout.as_secs_f64(), "task exceeded its deadline");
                    TaskOutcome::TimedOut
                }
            };

            info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                outcome = ?outcome,
                "task finished"
            );
            outcome
        }
        .instrument(span)
        .await
    }

    async fn process(&self, request: &TaskRequest) -> Result<DeliveryReport, PipelineError> {
        let attachments = decode_attachments(&request.attachments);
        info!(count = attachments.len(), "decoded attachments");

        let existing_code = if request.round > 1 {
            self.fetch_existing_code(&request.task).await
        } else {
            None
        };

        let generation = GenerationRequest {
            brief: request.brief.clone(),
            checks: request.checks.clone(),
            attachments: request.attachments.clone(),
            round: request.round,
            existing_code,
        };
        let response = self.providers.generate(&generation).await?;
        info!(model = %response.model_used, "content generated");

        let mut files = response.files();
        if self.code_validation {
            for (path, content) in &files {
                for warning in scan_code_safety(content, path) {
                    warn!(warning = %warning, "generated code flagged");
                }
            }
        }

        let description = sanitize_description(
            &format!("Round {}: {}", request.round, request.brief),
            DESCRIPTION_MAX_CHARS,
        );
        let repo = self.repos.create_or_get(&request.task, &description, false).await?;
        info!(repo_url = %repo.html_url, created = repo.created, "repository ready");

        for attachment in attachments {
            if !attachment.content.is_empty() && !files.contains_key(&attachment.name) {
                files.insert(attachment.name, attachment.content);
            }
        }

        let brief_excerpt: String = request.brief.chars().take(COMMIT_BRIEF_CHARS).collect();
        let message = format!("Round {}: {}", request.round, brief_excerpt);
        let committed = self
            .repos
            .commit_files(&repo.name, &files, &message, DEFAULT_BRANCH)
            .await?;
        // nothing changed: the head commit already holds these files
        let commit_sha = if committed.is_empty() {
            repo.commit_sha.clone()
        } else {
            committed
        };

        let pages_url = self.repos.enable_pages(&repo.name, DEFAULT_BRANCH, "/").await;

        let result = EvaluationResult {
            email: request.email.clone(),
            task: request.task.clone(),
            round: request.round,
            nonce: request.nonce.clone(),
            repo_url: repo.html_url,
            commit_sha,
            pages_url,
        };
        Ok(self.notifier.deliver(&request.evaluation_url, &result).await)
    }

    /// Previous round's markup; any failure counts as no prior code
    async fn fetch_existing_code(&self, task: &str) -> Option<String> {
        match self.repos.get_file_content(task, INDEX_FILE, DEFAULT_BRANCH).await {
            Ok(code) if !code.is_empty() => {
                info!(bytes = code.len(), "fetched existing code");
                Some(code)
            }
            Ok(_) => None,
            Err(err) => {
                warn!(error = %err, "could not fetch existing code");
                None
            }
        }
    }
}
