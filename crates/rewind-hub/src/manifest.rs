use crate::{HubError, RepoHost};
use async_trait::async_trait;
use rewind_core::RepoDescriptor;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One line of a manifest: a descriptor plus its precomputed commit count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestEntry {
    #[serde(flatten)]
    pub repo: RepoDescriptor,
    /// Attributable commits; bootstrap commits already left out.
    pub commits: u64,
}

/// Discovery from a JSON array of [`ManifestEntry`], for offline runs and
/// hosts other than GitHub.
#[derive(Debug, Clone)]
pub struct ManifestHost {
    pub path: PathBuf,
    entries: Vec<ManifestEntry>,
}

impl ManifestHost {
    pub fn load(path: &Path) -> Result<Self, HubError> {
        let content = std::fs::read_to_string(path).map_err(|source| HubError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: Vec<ManifestEntry> =
            serde_json::from_str(&content).map_err(|source| HubError::ManifestParse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }
}

#[async_trait]
impl RepoHost for ManifestHost {
    async fn list_repos(&self, filter: &str) -> Result<Vec<RepoDescriptor>, HubError> {
        let mut repos: Vec<RepoDescriptor> = self
            .entries
            .iter()
            .filter(|e| e.repo.name.contains(filter))
            .map(|e| e.repo.clone())
            .collect();
        repos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(repos)
    }

    async fn commit_count(
        &self,
        repo: &RepoDescriptor,
        _excluded_authors: &[String],
    ) -> Result<u64, HubError> {
        Ok(self
            .entries
            .iter()
            .find(|e| e.repo.name == repo.name)
            .map(|e| e.commits)
            .unwrap_or(0))
    }
}
