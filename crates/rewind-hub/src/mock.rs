//! In-memory [`RepoHost`] for orchestrator tests.

use crate::{HubError, RepoHost};
use async_trait::async_trait;
use rewind_core::RepoDescriptor;
use std::collections::HashSet;
use std::sync::Mutex;

pub struct MockHost {
    repos: Vec<(RepoDescriptor, u64)>,
    failing: HashSet<String>,
    count_queries: Mutex<Vec<String>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            repos: Vec::new(),
            failing: HashSet::new(),
            count_queries: Mutex::new(Vec::new()),
        }
    }

    pub fn repo(mut self, repo: RepoDescriptor, commits: u64) -> Self {
        self.repos.push((repo, commits));
        self
    }

    /// Make `commit_count` for `name` fail with an HTTP 500.
    pub fn fail_count(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn count_queries(&self) -> Vec<String> {
        self.count_queries.lock().unwrap().clone()
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RepoHost for MockHost {
    async fn list_repos(&self, filter: &str) -> Result<Vec<RepoDescriptor>, HubError> {
        let mut repos: Vec<_> = self
            .repos
            .iter()
            .filter(|(r, _)| r.name.contains(filter))
            .map(|(r, _)| r.clone())
            .collect();
        repos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(repos)
    }

    async fn commit_count(
        &self,
        repo: &RepoDescriptor,
        _excluded_authors: &[String],
    ) -> Result<u64, HubError> {
        self.count_queries.lock().unwrap().push(repo.name.clone());
        if self.failing.contains(&repo.name) {
            return Err(HubError::Status {
                url: format!("mock://{}", repo.name),
                status: 500,
                body: "mock failure".into(),
            });
        }
        Ok(self
            .repos
            .iter()
            .find(|(r, _)| r.name == repo.name)
            .map(|(_, n)| *n)
            .unwrap_or(0))
    }
}
