use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// Default cap on concurrently running repository tasks.
pub const DEFAULT_MAX_CONCURRENCY: usize = 200;

/// Name of the per-run report written under the assignment directory.
pub const REPORT_FILENAME: &str = "avgLinesInserted.txt";

/// Identity of one remote repository, as supplied by discovery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoDescriptor {
    pub name: String,
    pub clone_url: String,
    pub default_branch: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl RepoDescriptor {
    /// Remote-tracking ref the resolver walks, e.g. `origin/main`.
    pub fn tracking_ref(&self) -> String {
        format!("origin/{}", self.default_branch)
    }
}

/// A hexadecimal commit identifier. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitId(String);

impl CommitId {
    /// Returns `None` for blank or non-hex input, so "no commit" (or a stray
    /// line of tool output) can never masquerade as an id.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 10 characters, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(10)]
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where one repository task keeps its checkout: `<assignment_dir>/<display_name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRepoHandle {
    path: PathBuf,
}

impl LocalRepoHandle {
    pub fn new(assignment_dir: &Path, display_name: &str) -> Self {
        Self {
            path: assignment_dir.join(display_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One commit's `--shortstat` summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitStat {
    pub files_changed: u32,
    pub insertions: u32,
    pub deletions: Option<u32>,
}
