//! GitHub REST client (contents API)

use super::api::{FileWrite, RemoteFile, RepoApi, RepoMeta};
use super::GitHubError;
use crate::config::GitHubConfig;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Public API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Characters escaped inside one path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Deserialize)]
struct RepoBody {
    name: String,
    html_url: String,
    clone_url: String,
    #[serde(default = "default_branch")]
    default_branch: String,
}

fn default_branch() -> String {
    "main".to_string()
}

impl From<RepoBody> for RepoMeta {
    fn from(body: RepoBody) -> Self {
        RepoMeta {
            name: body.name,
            html_url: body.html_url,
            clone_url: body.clone_url,
            default_branch: body.default_branch,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ContentBody {
    path: String,
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PutBody {
    commit: CommitRef,
}

/// Authenticated client for one account
pub struct GitHubClient {
    client: reqwest::Client,
    token: String,
    owner: String,
    api_url: String,
}

impl GitHubClient {
    pub fn new(token: &str, owner: &str, api_url: &str) -> Result<Self, GitHubError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GitHubError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            token: token.to_string(),
            owner: owner.to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &GitHubConfig) -> Result<Self, GitHubError> {
        let api_url = config.api_url.as_deref().unwrap_or(DEFAULT_API_URL);
        Self::new(&config.token, &config.owner, api_url)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, concat!("sitewright/", env!("CARGO_PKG_VERSION")))
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    fn repo_url(&self, name: &str) -> String {
        format!("{}/repos/{}/{}", self.api_url, encode_segment(&self.owner), encode_segment(name))
    }

    fn contents_url(&self, name: &str, path: &str) -> String {
        let encoded: Vec<String> = path.split('/').map(encode_segment).collect();
        format!("{}/contents/{}", self.repo_url(name), encoded.join("/"))
    }
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Fail with a typed error unless the response is a success
async fn check(response: Response, what: &str) -> Result<Response, GitHubError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GitHubError::from_status(status.as_u16(), &body, what))
}

/// Contents API returns base64 wrapped at 60 columns
fn decode_content(encoded: &str) -> Result<String, GitHubError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| GitHubError::Decode(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[async_trait]
impl RepoApi for GitHubClient {
    fn owner(&self) -> &str {
        &self.owner
    }

    async fn get_repo(&self, name: &str) -> Result<RepoMeta, GitHubError> {
        let what = format!("repository {}/{}", self.owner, name);
        let response = self.request(Method::GET, &self.repo_url(name)).send().await?;
        let body: RepoBody = check(response, &what).await?.json().await?;
        Ok(body.into())
    }

    async fn create_repo(&self, name: &str, description: &str, private: bool) -> Result<RepoMeta, GitHubError> {
        let url = format!("{}/user/repos", self.api_url);
        let payload = serde_json::json!({
            "name": name,
            "description": description,
            "private": private,
            "auto_init": true
        });
        let response = self.request(Method::POST, &url).json(&payload).send().await?;
        let body: RepoBody = check(response, "user repositories").await?.json().await?;
        Ok(body.into())
    }

    async fn latest_commit_sha(&self, name: &str, branch: &str) -> Result<Option<String>, GitHubError> {
        let url = format!("{}/commits", self.repo_url(name));
        let response = self
            .request(Method::GET, &url)
            .query(&[("sha", branch), ("per_page", "1")])
            .send()
            .await?;

        // 409 is returned for a repository with no commits
        if response.status() == reqwest::StatusCode::CONFLICT {
            return Ok(None);
        }
        let commits: Vec<CommitRef> = match check(response, "commits").await {
            Ok(response) => response.json().await?,
            Err(GitHubError::NotFound(_)) => return Ok(None),
            Err(err) => return Err(err),
        };
        Ok(commits.into_iter().next().map(|c| c.sha))
    }

    async fn get_file(&self, name: &str, path: &str, branch: &str) -> Result<Option<RemoteFile>, GitHubError> {
        let response = self
            .request(Method::GET, &self.contents_url(name, path))
            .query(&[("ref", branch)])
            .send()
            .await?;

        let body: ContentBody = match check(response, path).await {
            Ok(response) => response.json().await?,
            Err(GitHubError::NotFound(_)) => return Ok(None),
            Err(err) => return Err(err),
        };

        Ok(Some(RemoteFile {
            path: body.path,
            content: decode_content(&body.content)?,
            sha: body.sha,
        }))
    }

    async fn put_file(&self, name: &str, write: FileWrite<'_>) -> Result<String, GitHubError> {
        let mut payload = serde_json::json!({
            "message": write.message,
            "content": STANDARD.encode(write.content.as_bytes()),
            "branch": write.branch
        });
        if let Some(sha) = write.sha {
            payload["sha"] = serde_json::Value::String(sha.to_string());
        }

        let response = self
            .request(Method::PUT, &self.contents_url(name, write.path))
            .json(&payload)
            .send()
            .await?;
        let body: PutBody = check(response, write.path).await?.json().await?;
        debug!(path = write.path, commit = %body.commit.sha, "wrote file");
        Ok(body.commit.sha)
    }

    async fn configure_pages(&self, name: &str, branch: &str, path: &str) -> Result<(), GitHubError> {
        let url = format!("{}/pages", self.repo_url(name));
        let payload = serde_json::json!({"source": {"branch": branch, "path": path}});
        let response = self.request(Method::POST, &url).json(&payload).send().await?;

        // 409: already enabled; 422: source already configured
        match response.status().as_u16() {
            409 | 422 => Ok(()),
            _ => check(response, "pages").await.map(|_| ()),
        }
    }
}
