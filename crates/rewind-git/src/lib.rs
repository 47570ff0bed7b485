//! Everything rewind knows about the `git` command line.
//!
//! The [`SourceControl`] trait is the seam between the repository pipeline and
//! the tool: [`GitCli`] shells out to a real `git`, [`mock::MockGit`] replays a
//! scripted history for tests.

pub mod cli;
pub mod diagnostic;
pub mod error;
pub mod mock;
pub mod resolve;
pub mod rollback;
pub mod shortstat;
pub mod version;

pub use cli::GitCli;
pub use diagnostic::{classify_line, first_diagnostic, Diagnostic, DiagnosticKind};
pub use error::{GitError, StatsError};
pub use resolve::{resolve_commit, Resolution};
pub use rollback::rollback_to;
pub use shortstat::{extract_stats, summarize, InsertionStats, StatsFailure};
pub use version::{GitVersion, MIN_GIT_VERSION};

use async_trait::async_trait;
use rewind_core::{CommitId, TargetMoment};
use std::path::Path;

/// Operations the pipeline needs from a source-control tool.
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Clone `url` into `dest`, which must not exist yet.
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), GitError>;

    /// Most recent commit on `git_ref` committed at or before `before`.
    async fn rev_list_before(
        &self,
        dir: &Path,
        git_ref: &str,
        before: &TargetMoment,
    ) -> Result<Option<CommitId>, GitError>;

    async fn reset_hard(&self, dir: &Path, commit: &CommitId) -> Result<(), GitError>;

    async fn head(&self, dir: &Path) -> Result<Option<CommitId>, GitError>;

    /// `git log --oneline --shortstat` from the current HEAD.
    async fn shortstat_log(&self, dir: &Path) -> Result<String, GitError>;

    /// Committer date of the root commit of `git_ref`, for skip messages.
    async fn oldest_commit_date(&self, dir: &Path, git_ref: &str)
        -> Result<Option<String>, GitError>;

    /// The remote's default branch as a tracking ref, e.g. `origin/main`.
    async fn origin_head(&self, dir: &Path) -> Result<String, GitError>;
}
