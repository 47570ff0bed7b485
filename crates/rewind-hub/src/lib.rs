//! Repository discovery: which remote repositories make up an assignment.

pub mod github;
pub mod manifest;
pub mod mock;

pub use github::GitHubHost;
pub use manifest::{ManifestEntry, ManifestHost};

use async_trait::async_trait;
use rewind_core::RepoDescriptor;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variables checked, in order, for a GitHub token.
pub const TOKEN_ENV_VARS: [&str; 2] = ["REWIND_GITHUB_TOKEN", "GITHUB_TOKEN"];

#[derive(Debug, Error)]
pub enum HubError {
    #[error("no GitHub token: set {} or {}", TOKEN_ENV_VARS[0], TOKEN_ENV_VARS[1])]
    MissingToken,

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("unexpected response from {url}: {detail}")]
    Decode { url: String, detail: String },

    #[error("reading manifest {}: {source}", path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing manifest {}: {source}", path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A place repositories are listed from.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Every repository whose name contains `filter`, sorted by name.
    async fn list_repos(&self, filter: &str) -> Result<Vec<RepoDescriptor>, HubError>;

    /// Commits on the default branch, not counting those by `excluded_authors`.
    async fn commit_count(
        &self,
        repo: &RepoDescriptor,
        excluded_authors: &[String],
    ) -> Result<u64, HubError>;
}

/// First non-empty token from [`TOKEN_ENV_VARS`].
pub fn token_from_env() -> Option<String> {
    TOKEN_ENV_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}
