//! Repository manager: create-or-fetch, diff-aware commits, pages

use super::api::{FileWrite, RepoMeta, SharedRepoApi};
use super::workflows::all_workflows;
use super::GitHubError;
use crate::config::RetryConfig;
use crate::retry::{retry_async, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Branch every site is committed to
pub const DEFAULT_BRANCH: &str = "main";

/// `commit_sha` reported for a repository with no commits
pub const INITIAL_COMMIT: &str = "initial";

/// Repository created or fetched for a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub name: String,
    pub html_url: String,
    pub clone_url: String,
    /// Head commit, or `initial`
    pub commit_sha: String,
    pub pages_url: String,
    pub default_branch: String,
    /// Whether this call created the repository
    pub created: bool,
}

/// Retry policies for each kind of repository operation
#[derive(Debug, Clone)]
pub struct RepoPolicies {
    pub create: RetryPolicy,
    pub commit: RetryPolicy,
    pub pages: RetryPolicy,
}

impl RepoPolicies {
    /// Create/commit: 3 attempts, pages: 2, bounded and scaled by the retry
    /// settings
    pub fn from_config(retry: &RetryConfig) -> Self {
        Self {
            create: retry.policy(3),
            commit: retry.policy(3),
            pages: retry.policy(2),
        }
    }

    /// Keep the attempt counts, override base delay and jitter
    pub fn with_timing(mut self, base: std::time::Duration, jitter: bool) -> Self {
        for policy in [&mut self.create, &mut self.commit, &mut self.pages] {
            policy.base_delay = base;
            policy.jitter = jitter;
        }
        self
    }
}

impl Default for RepoPolicies {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// High-level repository operations over a [`RepoApi`](super::RepoApi)
pub struct RepoManager {
    api: SharedRepoApi,
    policies: RepoPolicies,
}

impl RepoManager {
    pub fn new(api: SharedRepoApi) -> Self {
        Self {
            api,
            policies: RepoPolicies::default(),
        }
    }

    pub fn with_policies(mut self, policies: RepoPolicies) -> Self {
        self.policies = policies;
        self
    }

    /// Owner account
    pub fn owner(&self) -> &str {
        self.api.owner()
    }

    /// Predicted hosting URL for a repository
    pub fn pages_url(&self, name: &str) -> String {
        format!("https://{}.github.io/{}", self.api.owner().to_lowercase(), name)
    }

    /// Fetch the repository, creating it (with workflow templates) when absent
    pub async fn create_or_get(&self, name: &str, description: &str, private: bool) -> Result<RepoInfo, GitHubError> {
        let create_attempted = AtomicBool::new(false);
        let (meta, created) = retry_async(&self.policies.create, "create_or_get", GitHubError::is_transient, || {
            self.fetch_or_create(name, description, private, &create_attempted)
        })
        .await?;

        if created {
            match self
                .commit_files(name, &all_workflows(), "Add GitHub Actions workflows", &meta.default_branch)
                .await
            {
                Ok(_) => info!(repo = name, "added workflow templates"),
                Err(err) => warn!(repo = name, error = %err, "failed to add workflow templates"),
            }
        }

        let commit_sha = retry_async(&self.policies.create, "latest_commit_sha", GitHubError::is_transient, || {
            self.api.latest_commit_sha(name, &meta.default_branch)
        })
        .await?
        .unwrap_or_else(|| INITIAL_COMMIT.to_string());

        Ok(RepoInfo {
            pages_url: self.pages_url(name),
            name: meta.name,
            html_url: meta.html_url,
            clone_url: meta.clone_url,
            commit_sha,
            default_branch: meta.default_branch,
            created,
        })
    }

    async fn fetch_or_create(
        &self,
        name: &str,
        description: &str,
        private: bool,
        create_attempted: &AtomicBool,
    ) -> Result<(RepoMeta, bool), GitHubError> {
        match self.api.get_repo(name).await {
            Ok(meta) => {
                // an earlier attempt created it but its response was lost
                let created = create_attempted.load(Ordering::Relaxed);
                if !created {
                    info!(repo = name, "repository already exists");
                }
                Ok((meta, created))
            }
            Err(GitHubError::NotFound(_)) => {
                create_attempted.store(true, Ordering::Relaxed);
                let meta = self.api.create_repo(name, description, private).await?;
                info!(repo = name, "created repository");
                Ok((meta, true))
            }
            Err(err) => Err(err),
        }
    }

    /// Write every changed file to `branch`.
    ///
    /// Files whose content already matches are skipped. Returns the last
    /// commit sha made, or an empty string when nothing changed.
    pub async fn commit_files(
        &self,
        name: &str,
        files: &BTreeMap<String, String>,
        message: &str,
        branch: &str,
    ) -> Result<String, GitHubError> {
        retry_async(&self.policies.commit, "commit_files", GitHubError::is_transient, || {
            self.commit_files_once(name, files, message, branch)
        })
        .await
    }

    async fn commit_files_once(
        &self,
        name: &str,
        files: &BTreeMap<String, String>,
        message: &str,
        branch: &str,
    ) -> Result<String, GitHubError> {
        info!(repo = name, files = files.len(), "committing files");
        let mut last_commit = String::new();

        for (path, content) in files {
            let existing = self.api.get_file(name, path, branch).await?;
            if let Some(file) = &existing {
                if file.content == *content {
                    debug!(path = %path, "unchanged, skipping");
                    continue;
                }
            }

            let write = FileWrite {
                path,
                content,
                message,
                branch,
                sha: existing.as_ref().map(|f| f.sha.as_str()),
            };
            last_commit = self.api.put_file(name, write).await?;
            let action = if existing.is_some() { "updated" } else { "created" };
            debug!(path = %path, action, "wrote file");
        }

        info!(repo = name, commit = %short_sha(&last_commit), "commit finished");
        Ok(last_commit)
    }

    /// Content of `path` on `branch`; empty when the file is absent
    pub async fn get_file_content(&self, name: &str, path: &str, branch: &str) -> Result<String, GitHubError> {
        match self.api.get_file(name, path, branch).await? {
            Some(file) => Ok(file.content),
            None => {
                warn!(repo = name, path, "file not found");
                Ok(String::new())
            }
        }
    }

    /// Best-effort pages configuration; always returns the predicted URL
    pub async fn enable_pages(&self, name: &str, branch: &str, path: &str) -> String {
        let result = retry_async(&self.policies.pages, "enable_pages", GitHubError::is_transient, || {
            self.api.configure_pages(name, branch, path)
        })
        .await;

        if let Err(err) = result {
            warn!(repo = name, error = %err, "could not configure pages, relying on the workflow");
        }

        let url = self.pages_url(name);
        info!(repo = name, pages_url = %url, "pages url resolved");
        url
    }
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}
