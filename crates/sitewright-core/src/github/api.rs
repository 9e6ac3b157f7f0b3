//! Seam over the repository hosting REST API

use super::GitHubError;
use async_trait::async_trait;

/// Repository metadata as reported by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoMeta {
    pub name: String,
    pub html_url: String,
    pub clone_url: String,
    pub default_branch: String,
}

/// A file read from a branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    pub content: String,
    /// Blob sha, required to update the file
    pub sha: String,
}

/// A single-file create or update
#[derive(Debug, Clone, Copy)]
pub struct FileWrite<'a> {
    pub path: &'a str,
    pub content: &'a str,
    pub message: &'a str,
    pub branch: &'a str,
    /// Blob sha of the file being replaced; `None` creates it
    pub sha: Option<&'a str>,
}

/// Operations the repository manager needs from the host
#[async_trait]
pub trait RepoApi: Send + Sync {
    /// Account that owns the repositories
    fn owner(&self) -> &str;

    /// Fetch a repository; [`GitHubError::NotFound`] when absent
    async fn get_repo(&self, name: &str) -> Result<RepoMeta, GitHubError>;

    /// Create a public or private repository with an initial commit
    async fn create_repo(&self, name: &str, description: &str, private: bool) -> Result<RepoMeta, GitHubError>;

    /// Head commit of `branch`, `None` for an empty repository
    async fn latest_commit_sha(&self, name: &str, branch: &str) -> Result<Option<String>, GitHubError>;

    /// Read a file; `None` when it does not exist on `branch`
    async fn get_file(&self, name: &str, path: &str, branch: &str) -> Result<Option<RemoteFile>, GitHubError>;

    /// Create or update a file, returning the new commit sha
    async fn put_file(&self, name: &str, write: FileWrite<'_>) -> Result<String, GitHubError>;

    /// Turn on static hosting for `branch` at `path`
    async fn configure_pages(&self, name: &str, branch: &str, path: &str) -> Result<(), GitHubError>;
}

/// Shared handle to a repository API
pub type SharedRepoApi = std::sync::Arc<dyn RepoApi>;
