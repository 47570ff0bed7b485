use crate::diagnostic::first_diagnostic;
use crate::error::GitError;
use crate::version::{GitVersion, MIN_GIT_VERSION};
use crate::SourceControl;
use async_trait::async_trait;
use rewind_core::{CommitId, TargetMoment};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Runs the real `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    pub git_bin: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self {
            git_bin: PathBuf::from("git"),
        }
    }

    pub fn with_bin(git_bin: PathBuf) -> Self {
        Self { git_bin }
    }

    pub async fn version(&self) -> Result<GitVersion, GitError> {
        let out = self.run("--version", None, ["--version"]).await?;
        GitVersion::parse(&out).ok_or_else(|| GitError::UnexpectedOutput {
            op: "--version",
            detail: out.trim().to_string(),
        })
    }

    /// Check that git is reachable and at least [`MIN_GIT_VERSION`].
    pub async fn verify_available(&self) -> Result<GitVersion, GitError> {
        let version = self.version().await?;
        if version < MIN_GIT_VERSION {
            return Err(GitError::TooOld {
                found: version.to_string(),
                required: MIN_GIT_VERSION.to_string(),
            });
        }
        Ok(version)
    }

    /// Run one git command and return its stdout.
    ///
    /// Any diagnostic line on stdout or stderr fails the command even when the
    /// exit status is zero. The child is killed if the future is dropped.
    async fn run<I, S>(&self, op: &'static str, cwd: Option<&Path>, args: I) -> Result<String, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.git_bin);
        cmd.args(args)
            // Diagnostics and shortstat wording are only stable untranslated.
            .env("LC_ALL", "C")
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await.map_err(|source| GitError::Spawn {
            program: self.git_bin.display().to_string(),
            source,
        })?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if let Some(diag) = first_diagnostic(&stdout).or_else(|| first_diagnostic(&stderr)) {
            tracing::debug!(op, line = %diag.line, "git diagnostic");
            return Err(GitError::Diagnostic {
                op,
                kind: diag.kind,
                line: diag.line,
            });
        }
        if !output.status.success() {
            return Err(GitError::Exit {
                op,
                code: output.status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(stdout)
    }
}

#[async_trait]
impl SourceControl for GitCli {
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), GitError> {
        self.run("clone", None, [OsStr::new("clone"), OsStr::new(url), dest.as_os_str()])
            .await?;
        Ok(())
    }

    async fn rev_list_before(
        &self,
        dir: &Path,
        git_ref: &str,
        before: &TargetMoment,
    ) -> Result<Option<CommitId>, GitError> {
        let before_arg = format!("--before={}", before.git_timestamp());
        let out = self
            .run(
                "rev-list",
                Some(dir),
                ["rev-list", "-n", "1", before_arg.as_str(), git_ref, "--"],
            )
            .await?;
        Ok(out.lines().next().and_then(CommitId::parse))
    }

    async fn reset_hard(&self, dir: &Path, commit: &CommitId) -> Result<(), GitError> {
        self.run("reset", Some(dir), ["reset", "--hard", commit.as_str()])
            .await?;
        Ok(())
    }

    async fn head(&self, dir: &Path) -> Result<Option<CommitId>, GitError> {
        let out = self.run("rev-parse", Some(dir), ["rev-parse", "HEAD"]).await?;
        Ok(out.lines().next().and_then(CommitId::parse))
    }

    async fn shortstat_log(&self, dir: &Path) -> Result<String, GitError> {
        self.run(
            "log",
            Some(dir),
            ["log", "--oneline", "--shortstat", "--no-color"],
        )
        .await
    }

    async fn oldest_commit_date(
        &self,
        dir: &Path,
        git_ref: &str,
    ) -> Result<Option<String>, GitError> {
        let out = self
            .run(
                "log",
                Some(dir),
                ["log", "--reverse", "--max-parents=0", "--format=%ci", git_ref, "--"],
            )
            .await?;
        Ok(out
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string))
    }

    async fn origin_head(&self, dir: &Path) -> Result<String, GitError> {
        let out = self
            .run(
                "rev-parse",
                Some(dir),
                ["rev-parse", "--abbrev-ref", "origin/HEAD"],
            )
            .await?;
        let name = out.trim();
        if name.is_empty() || name == "origin/HEAD" {
            return Err(GitError::UnexpectedOutput {
                op: "rev-parse",
                detail: format!("origin/HEAD does not name a branch ({name:?})"),
            });
        }
        Ok(name.to_string())
    }
}
