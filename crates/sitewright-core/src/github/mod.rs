//! Source hosting integration
//!
//! [`RepoApi`] is the seam over the REST API, [`GitHubClient`] its real
//! implementation and [`RepoManager`] the retrying operations the task
//! pipeline uses.

mod api;
mod client;
mod error;
mod manager;
pub mod workflows;

pub use api::{FileWrite, RemoteFile, RepoApi, RepoMeta, SharedRepoApi};
pub use client::{GitHubClient, DEFAULT_API_URL};
pub use error::GitHubError;
pub use manager::{RepoInfo, RepoManager, RepoPolicies, DEFAULT_BRANCH, INITIAL_COMMIT};
