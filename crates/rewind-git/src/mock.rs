//! Scripted [`SourceControl`] for tests that should not touch a real `git`.

use crate::diagnostic::DiagnosticKind;
use crate::error::GitError;
use crate::SourceControl;
use rewind_core::{format_git_date, CommitId, TargetMoment};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use time::OffsetDateTime;

#[derive(Debug, Clone)]
pub struct MockCommit {
    pub id: CommitId,
    pub committed_at: OffsetDateTime,
    /// `None` for an empty commit (no shortstat line).
    pub insertions: Option<u32>,
}

/// History and failure script for one remote.
#[derive(Debug, Clone)]
pub struct MockRepo {
    pub default_branch: String,
    /// Oldest first.
    pub commits: Vec<MockCommit>,
    clone_error: Option<String>,
    reset_error: Option<String>,
    log_output: Option<String>,
    log_error: Option<String>,
}

impl MockRepo {
    pub fn new(default_branch: &str) -> Self {
        Self {
            default_branch: default_branch.to_string(),
            commits: Vec::new(),
            clone_error: None,
            reset_error: None,
            log_output: None,
            log_error: None,
        }
    }

    pub fn commit(mut self, id: &str, committed_at: OffsetDateTime, insertions: Option<u32>) -> Self {
        self.commits.push(MockCommit {
            id: CommitId::parse(id).unwrap_or_else(|| panic!("bad mock commit id {id:?}")),
            committed_at,
            insertions,
        });
        self
    }

    /// Make `clone` print this `fatal:` line.
    pub fn fail_clone(mut self, line: &str) -> Self {
        self.clone_error = Some(line.to_string());
        self
    }

    pub fn fail_reset(mut self, line: &str) -> Self {
        self.reset_error = Some(line.to_string());
        self
    }

    /// Replace the generated log with fixed text.
    pub fn log_output(mut self, text: &str) -> Self {
        self.log_output = Some(text.to_string());
        self
    }

    pub fn fail_log(mut self, line: &str) -> Self {
        self.log_error = Some(line.to_string());
        self
    }

    fn tracking_ref(&self) -> String {
        format!("origin/{}", self.default_branch)
    }
}

/// One recorded mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Clone { url: String, dest: PathBuf },
    Reset { dir: PathBuf, commit: CommitId },
}

struct Checkout {
    url: String,
    head: Option<usize>,
}

/// In-memory remotes keyed by clone URL. `clone_repo` creates the destination
/// directory so filesystem assertions still hold.
pub struct MockGit {
    repos: Mutex<HashMap<String, MockRepo>>,
    checkouts: Mutex<HashMap<PathBuf, Checkout>>,
    calls: Mutex<Vec<MockCall>>,
}

impl Default for MockGit {
    fn default() -> Self {
        Self::new()
    }
}

fn fatal(op: &'static str, line: String) -> GitError {
    GitError::Diagnostic {
        op,
        kind: DiagnosticKind::Fatal,
        line,
    }
}

impl MockGit {
    pub fn new() -> Self {
        Self {
            repos: Mutex::new(HashMap::new()),
            checkouts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn add_repo(&self, url: &str, repo: MockRepo) {
        self.repos.lock().unwrap().insert(url.to_string(), repo);
    }

    /// Register `dir` as an existing checkout of `url`, at the remote's tip.
    pub fn with_checkout(&self, dir: &Path, url: &str) {
        let head = self
            .repos
            .lock()
            .unwrap()
            .get(url)
            .and_then(|r| r.commits.len().checked_sub(1));
        self.checkouts.lock().unwrap().insert(
            dir.to_path_buf(),
            Checkout {
                url: url.to_string(),
                head,
            },
        );
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clone_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::Clone { .. }))
            .count()
    }

    pub fn reset_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::Reset { .. }))
            .count()
    }

    /// Repo script and current head index for a checkout.
    fn checkout(&self, op: &'static str, dir: &Path) -> Result<(MockRepo, Option<usize>), GitError> {
        let checkouts = self.checkouts.lock().unwrap();
        let co = checkouts.get(dir).ok_or_else(|| {
            fatal(
                op,
                "fatal: not a git repository (or any of the parent directories): .git".into(),
            )
        })?;
        let repo = self
            .repos
            .lock()
            .unwrap()
            .get(&co.url)
            .cloned()
            .ok_or_else(|| fatal(op, format!("fatal: '{}' does not appear to be a git repository", co.url)))?;
        Ok((repo, co.head))
    }

    fn check_ref(op: &'static str, repo: &MockRepo, git_ref: &str) -> Result<(), GitError> {
        if git_ref != repo.tracking_ref() {
            return Err(fatal(op, format!("fatal: bad revision '{git_ref}'")));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SourceControl for MockGit {
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), GitError> {
        self.calls.lock().unwrap().push(MockCall::Clone {
            url: url.to_string(),
            dest: dest.to_path_buf(),
        });
        let repo = self
            .repos
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| fatal("clone", format!("fatal: repository '{url}' not found")))?;
        if let Some(line) = repo.clone_error {
            return Err(fatal("clone", line));
        }
        if dest.exists() {
            return Err(fatal(
                "clone",
                format!(
                    "fatal: destination path '{}' already exists and is not an empty directory.",
                    dest.display()
                ),
            ));
        }
        std::fs::create_dir_all(dest).map_err(|e| {
            fatal(
                "clone",
                format!("fatal: could not create work tree dir '{}': {e}", dest.display()),
            )
        })?;
        self.checkouts.lock().unwrap().insert(
            dest.to_path_buf(),
            Checkout {
                url: url.to_string(),
                head: repo.commits.len().checked_sub(1),
            },
        );
        Ok(())
    }

    async fn rev_list_before(
        &self,
        dir: &Path,
        git_ref: &str,
        before: &TargetMoment,
    ) -> Result<Option<CommitId>, GitError> {
        let (repo, _) = self.checkout("rev-list", dir)?;
        Self::check_ref("rev-list", &repo, git_ref)?;
        Ok(repo
            .commits
            .iter()
            .rev()
            .find(|c| c.committed_at <= before.due())
            .map(|c| c.id.clone()))
    }

    async fn reset_hard(&self, dir: &Path, commit: &CommitId) -> Result<(), GitError> {
        self.calls.lock().unwrap().push(MockCall::Reset {
            dir: dir.to_path_buf(),
            commit: commit.clone(),
        });
        let (repo, _) = self.checkout("reset", dir)?;
        if let Some(line) = repo.reset_error {
            return Err(fatal("reset", line));
        }
        let idx = repo
            .commits
            .iter()
            .position(|c| &c.id == commit)
            .ok_or_else(|| {
                fatal(
                    "reset",
                    format!("fatal: ambiguous argument '{commit}': unknown revision"),
                )
            })?;
        if let Some(co) = self.checkouts.lock().unwrap().get_mut(dir) {
            co.head = Some(idx);
        }
        Ok(())
    }

    async fn head(&self, dir: &Path) -> Result<Option<CommitId>, GitError> {
        let (repo, head) = self.checkout("rev-parse", dir)?;
        Ok(head.map(|i| repo.commits[i].id.clone()))
    }

    async fn shortstat_log(&self, dir: &Path) -> Result<String, GitError> {
        let (repo, head) = self.checkout("log", dir)?;
        if let Some(line) = repo.log_error {
            return Err(fatal("log", line));
        }
        if let Some(text) = repo.log_output {
            return Ok(text);
        }
        let Some(head) = head else {
            return Err(fatal(
                "log",
                "fatal: your current branch 'main' does not have any commits yet".into(),
            ));
        };
        let mut out = String::new();
        for (i, c) in repo.commits[..=head].iter().enumerate().rev() {
            out.push_str(&format!("{} commit {i}\n", c.id.short()));
            if let Some(n) = c.insertions {
                let noun = if n == 1 { "insertion" } else { "insertions" };
                out.push_str(&format!(" 1 file changed, {n} {noun}(+)\n"));
            }
        }
        Ok(out)
    }

    async fn oldest_commit_date(
        &self,
        dir: &Path,
        git_ref: &str,
    ) -> Result<Option<String>, GitError> {
        let (repo, _) = self.checkout("log", dir)?;
        Self::check_ref("log", &repo, git_ref)?;
        Ok(repo.commits.first().map(|c| format_git_date(c.committed_at)))
    }

    async fn origin_head(&self, dir: &Path) -> Result<String, GitError> {
        let (repo, _) = self.checkout("rev-parse", dir)?;
        Ok(repo.tracking_ref())
    }
}
