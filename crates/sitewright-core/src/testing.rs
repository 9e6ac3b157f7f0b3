//! In-memory fakes for tests
//!
//! Enabled for this crate's own tests and, through the `test-utils` feature,
//! for downstream crates.

use crate::github::{FileWrite, GitHubError, RemoteFile, RepoApi, RepoMeta};
use crate::llm::{
    fallback::fallback_readme, prompts::MIT_LICENSE, GenerationError, GenerationProvider,
    GenerationRequest, GenerationResponse,
};
use crate::models::TaskRequest;
use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

#[derive(Debug, Default)]
struct FakeRepo {
    meta: Option<RepoMeta>,
    /// (branch, path) -> content
    files: BTreeMap<(String, String), String>,
    commits: Vec<String>,
}

#[derive(Debug, Default)]
struct FakeState {
    repos: BTreeMap<String, FakeRepo>,
    failures: VecDeque<GitHubError>,
    commit_counter: u64,
    put_calls: usize,
    pages_calls: usize,
    lose_create_response: bool,
}

impl FakeState {
    fn next_commit(&mut self, repo: &str) -> String {
        self.commit_counter += 1;
        let sha = format!("{:040x}", self.commit_counter);
        if let Some(r) = self.repos.get_mut(repo) {
            r.commits.push(sha.clone());
        }
        sha
    }
}

fn blob_sha(content: &str) -> String {
    hex::encode(&Sha256::digest(content.as_bytes())[..20])
}

fn meta_for(owner: &str, name: &str) -> RepoMeta {
    RepoMeta {
        name: name.to_string(),
        html_url: format!("https://github.com/{}/{}", owner, name),
        clone_url: format!("https://github.com/{}/{}.git", owner, name),
        default_branch: "main".to_string(),
    }
}

/// [`RepoApi`] backed by maps, with injectable one-shot failures
pub struct InMemoryRepoApi {
    owner: String,
    state: Mutex<FakeState>,
}

impl InMemoryRepoApi {
    pub fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Pre-existing repository with one commit
    pub fn with_repo(self, name: &str) -> Self {
        {
            let mut state = self.state.lock();
            state.repos.insert(
                name.to_string(),
                FakeRepo {
                    meta: Some(meta_for(&self.owner, name)),
                    ..Default::default()
                },
            );
            state.next_commit(name);
        }
        self
    }

    /// Pre-existing file on `main`
    pub fn with_file(self, repo: &str, path: &str, content: &str) -> Self {
        self.state
            .lock()
            .repos
            .entry(repo.to_string())
            .or_default()
            .files
            .insert(("main".to_string(), path.to_string()), content.to_string());
        self
    }

    /// Make the next API call fail with `err`; calls queue up in order
    pub fn fail_next(&self, err: GitHubError) {
        self.state.lock().failures.push_back(err);
    }

    /// Make the next `create_repo` create the repository and then answer 502
    pub fn lose_next_create_response(&self) {
        self.state.lock().lose_create_response = true;
    }

    /// Content of `path` on `main`
    pub fn file(&self, repo: &str, path: &str) -> Option<String> {
        self.state
            .lock()
            .repos
            .get(repo)
            .and_then(|r| r.files.get(&("main".to_string(), path.to_string())).cloned())
    }

    pub fn repo_exists(&self, repo: &str) -> bool {
        self.state
            .lock()
            .repos
            .get(repo)
            .is_some_and(|r| r.meta.is_some())
    }

    /// Number of file writes so far
    pub fn put_calls(&self) -> usize {
        self.state.lock().put_calls
    }

    /// Number of pages configuration calls so far, failed ones included
    pub fn pages_calls(&self) -> usize {
        self.state.lock().pages_calls
    }

    fn take_failure(&self) -> Result<(), GitHubError> {
        match self.state.lock().failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RepoApi for InMemoryRepoApi {
    fn owner(&self) -> &str {
        &self.owner
    }

    async fn get_repo(&self, name: &str) -> Result<RepoMeta, GitHubError> {
        self.take_failure()?;
        self.state
            .lock()
            .repos
            .get(name)
            .and_then(|r| r.meta.clone())
            .ok_or_else(|| GitHubError::NotFound(format!("repository {}", name)))
    }

    async fn create_repo(&self, name: &str, _description: &str, _private: bool) -> Result<RepoMeta, GitHubError> {
        self.take_failure()?;
        let mut state = self.state.lock();
        let repo = state.repos.entry(name.to_string()).or_default();
        if repo.meta.is_some() {
            return Err(GitHubError::Api {
                status: 422,
                message: "name already exists on this account".to_string(),
            });
        }
        let meta = meta_for(&self.owner, name);
        repo.meta = Some(meta.clone());
        repo.files
            .insert(("main".to_string(), "README.md".to_string()), format!("# {}", name));
        state.next_commit(name);
        if std::mem::take(&mut state.lose_create_response) {
            return Err(GitHubError::Api {
                status: 502,
                message: "bad gateway".to_string(),
            });
        }
        Ok(meta)
    }

    async fn latest_commit_sha(&self, name: &str, _branch: &str) -> Result<Option<String>, GitHubError> {
        self.take_failure()?;
        Ok(self
            .state
            .lock()
            .repos
            .get(name)
            .and_then(|r| r.commits.last().cloned()))
    }

    async fn get_file(&self, name: &str, path: &str, branch: &str) -> Result<Option<RemoteFile>, GitHubError> {
        self.take_failure()?;
        let state = self.state.lock();
        Ok(state
            .repos
            .get(name)
            .and_then(|r| r.files.get(&(branch.to_string(), path.to_string())))
            .map(|content| RemoteFile {
                path: path.to_string(),
                content: content.clone(),
                sha: blob_sha(content),
            }))
    }

    async fn put_file(&self, name: &str, write: FileWrite<'_>) -> Result<String, GitHubError> {
        self.take_failure()?;
        let mut state = self.state.lock();
        state.put_calls += 1;

        let key = (write.branch.to_string(), write.path.to_string());
        let repo = state
            .repos
            .get_mut(name)
            .ok_or_else(|| GitHubError::NotFound(format!("repository {}", name)))?;

        let current_sha = repo.files.get(&key).map(|c| blob_sha(c));
        if current_sha.as_deref() != write.sha {
            return Err(GitHubError::Api {
                status: 409,
                message: format!("{} does not match", write.path),
            });
        }

        repo.files.insert(key, write.content.to_string());
        Ok(state.next_commit(name))
    }

    async fn configure_pages(&self, name: &str, _branch: &str, _path: &str) -> Result<(), GitHubError> {
        self.state.lock().pages_calls += 1;
        self.take_failure()?;
        let state = self.state.lock();
        if state.repos.get(name).is_some_and(|r| r.meta.is_some()) {
            Ok(())
        } else {
            Err(GitHubError::NotFound(format!("repository {}", name)))
        }
    }
}

/// Provider returning a canned page (or failing), recording every request
pub struct ScriptedProvider {
    id: String,
    index_html: Option<String>,
    delay: Option<Duration>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedProvider {
    pub fn succeeding(id: &str, index_html: &str) -> Self {
        Self {
            id: id.to_string(),
            index_html: Some(index_html.to_string()),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(id: &str) -> Self {
        Self {
            id: id.to_string(),
            index_html: None,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn model(&self) -> String {
        format!("{}-model", self.id)
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, GenerationError> {
        self.requests.lock().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.index_html {
            Some(html) => Ok(GenerationResponse {
                index_html: html.clone(),
                readme_md: fallback_readme(&request.brief),
                license_text: MIT_LICENSE.to_string(),
                additional_files: BTreeMap::new(),
                model_used: self.model(),
                generation_time: Duration::ZERO,
            }),
            None => Err(GenerationError::new(&self.id, self.model(), "scripted failure")),
        }
    }

    async fn health_check(&self) -> bool {
        self.index_html.is_some()
    }
}

/// A valid round-1 request reporting to `evaluation_url`
pub fn sample_request(evaluation_url: &str) -> TaskRequest {
    TaskRequest {
        email: "student@example.com".to_string(),
        secret: "s3cret".to_string(),
        task: "counter-app-1a2b".to_string(),
        round: 1,
        nonce: "nonce-123".to_string(),
        brief: "Build a click counter".to_string(),
        checks: vec!["#count-btn increments #count".to_string()],
        evaluation_url: evaluation_url.to_string(),
        attachments: Vec::new(),
    }
}

/// Serve `router` on an ephemeral local port; returns its base URL
#[cfg(test)]
pub(crate) async fn serve(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{}", addr)
}

/// Local callback endpoint answering with scripted statuses (then 200)
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct CallbackSink {
    statuses: std::sync::Arc<Mutex<VecDeque<u16>>>,
    received: std::sync::Arc<Mutex<Vec<(std::time::Instant, serde_json::Value)>>>,
}

#[cfg(test)]
impl CallbackSink {
    pub(crate) fn responding(statuses: &[u16]) -> Self {
        let sink = Self::default();
        sink.statuses.lock().extend(statuses.iter().copied());
        sink
    }

    /// Start serving; returns the callback URL
    pub(crate) async fn start(&self) -> String {
        use axum::{extract::State, http::StatusCode, routing::post, Json, Router};

        let app = Router::new()
            .route(
                "/notify",
                post(
                    |State(sink): State<CallbackSink>, Json(body): Json<serde_json::Value>| async move {
                        sink.received.lock().push((std::time::Instant::now(), body));
                        let status = sink.statuses.lock().pop_front().unwrap_or(200);
                        StatusCode::from_u16(status).unwrap_or(StatusCode::OK)
                    },
                ),
            )
            .with_state(self.clone());
        format!("{}/notify", serve(app).await)
    }

    pub(crate) fn received(&self) -> Vec<serde_json::Value> {
        self.received.lock().iter().map(|(_, body)| body.clone()).collect()
    }

    /// Gaps between consecutive deliveries
    pub(crate) fn gaps(&self) -> Vec<Duration> {
        let received = self.received.lock();
        received
            .windows(2)
            .map(|pair| pair[1].0.duration_since(pair[0].0))
            .collect()
    }
}
