//! The per-repository pipeline.
//!
//! eligibility → clone → resolve → rollback → stats. Every stage failure is
//! turned into a [`RepoOutcome`]; nothing escapes [`run_repo_task`].

use rewind_core::{LocalRepoHandle, RepoDescriptor, RepoOutcome, Stage, TargetMoment};
use rewind_git::{
    extract_stats, resolve_commit, rollback_to, GitError, Resolution, SourceControl, StatsFailure,
};
use rewind_hub::RepoHost;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;

/// What one task works on.
#[derive(Debug, Clone)]
pub enum RepoJob {
    /// A remote repository that still has to be cloned.
    Clone {
        descriptor: RepoDescriptor,
        display_name: String,
    },
    /// A checkout already on disk; its default branch comes from `origin/HEAD`.
    Existing { display_name: String, dir: PathBuf },
}

impl RepoJob {
    pub fn display_name(&self) -> &str {
        match self {
            RepoJob::Clone { display_name, .. } | RepoJob::Existing { display_name, .. } => {
                display_name
            }
        }
    }

    /// Name to identify the repository by in logs.
    pub fn repo_name(&self) -> &str {
        match self {
            RepoJob::Clone { descriptor, .. } => &descriptor.name,
            RepoJob::Existing { display_name, .. } => display_name,
        }
    }

    fn first_stage(&self) -> Stage {
        match self {
            RepoJob::Clone { .. } => Stage::Eligibility,
            RepoJob::Existing { .. } => Stage::Resolve,
        }
    }
}

/// Shared, read-only inputs for every task of one run.
pub struct TaskContext {
    pub scm: Arc<dyn SourceControl>,
    /// Needed by [`RepoJob::Clone`] for the commit count.
    pub host: Option<Arc<dyn RepoHost>>,
    pub moment: TargetMoment,
    pub assignment_dir: PathBuf,
    pub bootstrap_authors: Vec<String>,
}

/// Run the whole pipeline for one job. Always returns an outcome.
pub async fn run_repo_task(ctx: &TaskContext, job: &RepoJob) -> RepoOutcome {
    let outcome = match job {
        RepoJob::Clone {
            descriptor,
            display_name,
        } => run_clone_job(ctx, descriptor, display_name).await,
        RepoJob::Existing { dir, .. } => run_existing_job(ctx, dir).await,
    };
    log_outcome(job.display_name(), &outcome);
    outcome
}

/// Outcome for a task that ended without reporting one.
pub(crate) fn lost_outcome(job: &RepoJob) -> RepoOutcome {
    RepoOutcome::Failed {
        stage: job.first_stage(),
        error: "task ended without reporting an outcome".into(),
    }
}

async fn run_clone_job(
    ctx: &TaskContext,
    descriptor: &RepoDescriptor,
    display_name: &str,
) -> RepoOutcome {
    let repo = descriptor.name.as_str();

    // ── Eligibility ──
    tracing::debug!(repo, stage = %Stage::Eligibility, "start");
    let Some(host) = ctx.host.as_ref() else {
        return RepoOutcome::Failed {
            stage: Stage::Eligibility,
            error: "no repository host configured for commit counts".into(),
        };
    };
    let commits = match host.commit_count(descriptor, &ctx.bootstrap_authors).await {
        Ok(n) => n,
        Err(e) => {
            return RepoOutcome::Failed {
                stage: Stage::Eligibility,
                error: e.to_string(),
            }
        }
    };
    if commits == 0 {
        return RepoOutcome::SkippedNoCommits;
    }
    if ctx.moment.is_before(descriptor.created_at) {
        let created_at = descriptor
            .created_at
            .to_offset(ctx.moment.offset())
            .format(&Rfc3339)
            .unwrap_or_default();
        return RepoOutcome::SkippedCreatedAfterDeadline { created_at };
    }

    // ── Clone ──
    let handle = LocalRepoHandle::new(&ctx.assignment_dir, display_name);
    tracing::debug!(repo, stage = %Stage::Clone, dest = %handle.path().display(), "start");
    if let Err(e) = ctx.scm.clone_repo(&descriptor.clone_url, handle.path()).await {
        return if e.is_tool_report() {
            RepoOutcome::SkippedCloneFailed {
                reason: e.to_string(),
            }
        } else {
            failed(Stage::Clone, e)
        };
    }

    rewind_and_measure(ctx, handle.path(), &descriptor.tracking_ref()).await
}

async fn run_existing_job(ctx: &TaskContext, dir: &Path) -> RepoOutcome {
    let git_ref = match ctx.scm.origin_head(dir).await {
        Ok(r) => r,
        Err(e) => return rollback_skip_or_fail(Stage::Resolve, e),
    };
    rewind_and_measure(ctx, dir, &git_ref).await
}

/// Resolve, reset and measure a checkout that is already on disk.
async fn rewind_and_measure(ctx: &TaskContext, dir: &Path, git_ref: &str) -> RepoOutcome {
    let scm = ctx.scm.as_ref();

    // ── Resolve ──
    tracing::debug!(dir = %dir.display(), stage = %Stage::Resolve, git_ref, "start");
    let commit = match resolve_commit(scm, dir, git_ref, &ctx.moment).await {
        Ok(Resolution::Found(id)) => id,
        Ok(Resolution::Absent { oldest }) => {
            let mut reason = format!("no commit on {git_ref} at or before {}", ctx.moment);
            if let Some(date) = oldest {
                reason.push_str(&format!("; oldest commit is {date}"));
            }
            return RepoOutcome::SkippedRollbackFailed {
                stage: Stage::Resolve,
                reason,
            };
        }
        Err(e) => return rollback_skip_or_fail(Stage::Resolve, e),
    };

    // ── Rollback ──
    tracing::debug!(dir = %dir.display(), stage = %Stage::Rollback, commit = commit.short(), "start");
    if let Err(e) = rollback_to(scm, dir, &commit).await {
        return rollback_skip_or_fail(Stage::Rollback, e);
    }

    // ── Stats ──
    tracing::debug!(dir = %dir.display(), stage = %Stage::Stats, "start");
    match extract_stats(scm, dir).await {
        Ok(stats) => RepoOutcome::Completed {
            average_insertions: stats.average(),
        },
        Err(StatsFailure::Ambiguous(e)) => RepoOutcome::SkippedStatsAmbiguous {
            reason: e.to_string(),
        },
        Err(StatsFailure::Git(e)) => failed(Stage::Stats, e),
    }
}

/// Resolution and reset problems reported by git are skips; anything else
/// (git missing, unreadable output) is unexpected.
fn rollback_skip_or_fail(stage: Stage, e: GitError) -> RepoOutcome {
    match e {
        GitError::Diagnostic { .. } | GitError::Exit { .. } | GitError::UnexpectedOutput { .. } => {
            RepoOutcome::SkippedRollbackFailed {
                stage,
                reason: e.to_string(),
            }
        }
        GitError::Spawn { .. } | GitError::TooOld { .. } => failed(stage, e),
    }
}

fn failed(stage: Stage, e: GitError) -> RepoOutcome {
    RepoOutcome::Failed {
        stage,
        error: e.to_string(),
    }
}

fn log_outcome(repo: &str, outcome: &RepoOutcome) {
    let stage = outcome.stage().map(|s| s.as_str()).unwrap_or("done");
    let reason = outcome.reason().unwrap_or_default();
    match outcome {
        RepoOutcome::Completed { average_insertions } => {
            tracing::debug!(repo, average_insertions, "completed");
        }
        RepoOutcome::Failed { .. } => {
            tracing::error!(repo, stage, reason = %reason, "unexpected failure");
        }
        _ => {
            tracing::warn!(repo, stage, reason = %reason, "skipped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewind_git::mock::{MockGit, MockRepo};
    use rewind_hub::mock::MockHost;
    use time::macros::{date, datetime, offset, time};
    use time::OffsetDateTime;

    fn descriptor(name: &str, created_at: OffsetDateTime) -> RepoDescriptor {
        RepoDescriptor {
            name: name.into(),
            clone_url: format!("mock://{name}"),
            default_branch: "main".into(),
            created_at,
        }
    }

    fn due() -> TargetMoment {
        TargetMoment::new(date!(2024 - 02 - 01), time!(23:59), offset!(-5))
    }

    fn ctx(dir: &Path, git: Arc<MockGit>, host: MockHost) -> TaskContext {
        TaskContext {
            scm: git,
            host: Some(Arc::new(host)),
            moment: due(),
            assignment_dir: dir.to_path_buf(),
            bootstrap_authors: vec!["github-classroom[bot]".into()],
        }
    }

    fn job(d: &RepoDescriptor) -> RepoJob {
        RepoJob::Clone {
            descriptor: d.clone(),
            display_name: d.name.clone(),
        }
    }

    fn five_commits() -> MockRepo {
        MockRepo::new("main")
            .commit("c1c1c1c1", datetime!(2024-01-10 12:00 UTC), Some(3))
            .commit("c2c2c2c2", datetime!(2024-01-20 12:00 UTC), Some(7))
            .commit("c3c3c3c3", datetime!(2024-02-05 12:00 UTC), Some(100))
            .commit("c4c4c4c4", datetime!(2024-02-06 12:00 UTC), Some(100))
            .commit("c5c5c5c5", datetime!(2024-02-07 12:00 UTC), Some(100))
    }

    #[tokio::test]
    async fn zero_commits_never_clones() {
        let dir = tempfile::tempdir().unwrap();
        let git = Arc::new(MockGit::new());
        let d = descriptor("hw1-a", datetime!(2024-01-01 00:00 UTC));
        git.add_repo(&d.clone_url, five_commits());
        let c = ctx(dir.path(), git.clone(), MockHost::new().repo(d.clone(), 0));

        let out = run_repo_task(&c, &job(&d)).await;
        assert_eq!(out, RepoOutcome::SkippedNoCommits);
        assert_eq!(git.clone_count(), 0);
        assert!(!dir.path().join("hw1-a").exists());
    }

    #[tokio::test]
    async fn created_after_due_never_clones() {
        let dir = tempfile::tempdir().unwrap();
        let git = Arc::new(MockGit::new());
        // 2024-02-02 05:00 UTC is 00:00 at -05:00, one minute after due.
        let d = descriptor("hw1-late", datetime!(2024-02-02 05:00 UTC));
        git.add_repo(&d.clone_url, five_commits());
        let c = ctx(dir.path(), git.clone(), MockHost::new().repo(d.clone(), 5));

        let out = run_repo_task(&c, &job(&d)).await;
        assert!(matches!(out, RepoOutcome::SkippedCreatedAfterDeadline { .. }));
        assert_eq!(git.clone_count(), 0);
        assert!(!dir.path().join("hw1-late").exists());
    }

    #[tokio::test]
    async fn full_pipeline_measures_history_before_due() {
        let dir = tempfile::tempdir().unwrap();
        let git = Arc::new(MockGit::new());
        let d = descriptor("hw1-c", datetime!(2024-01-01 00:00 UTC));
        git.add_repo(&d.clone_url, five_commits());
        let c = ctx(dir.path(), git.clone(), MockHost::new().repo(d.clone(), 5));

        let out = run_repo_task(&c, &job(&d)).await;
        assert_eq!(
            out,
            RepoOutcome::Completed {
                average_insertions: 5.0
            }
        );
        assert!(dir.path().join("hw1-c").is_dir());
    }

    #[tokio::test]
    async fn clone_report_is_a_skip() {
        let dir = tempfile::tempdir().unwrap();
        let git = Arc::new(MockGit::new());
        let d = descriptor("hw1-x", datetime!(2024-01-01 00:00 UTC));
        git.add_repo(
            &d.clone_url,
            five_commits().fail_clone("fatal: Authentication failed"),
        );
        let c = ctx(dir.path(), git, MockHost::new().repo(d.clone(), 5));

        let out = run_repo_task(&c, &job(&d)).await;
        assert!(matches!(out, RepoOutcome::SkippedCloneFailed { .. }));
    }

    #[tokio::test]
    async fn absent_commit_skips_without_reset() {
        let dir = tempfile::tempdir().unwrap();
        let git = Arc::new(MockGit::new());
        let d = descriptor("hw1-y", datetime!(2024-01-01 00:00 UTC));
        git.add_repo(
            &d.clone_url,
            MockRepo::new("main").commit("c9c9c9c9", datetime!(2024-03-01 00:00 UTC), Some(1)),
        );
        let c = ctx(dir.path(), git.clone(), MockHost::new().repo(d.clone(), 1));

        let out = run_repo_task(&c, &job(&d)).await;
        match out {
            RepoOutcome::SkippedRollbackFailed { stage, reason } => {
                assert_eq!(stage, Stage::Resolve);
                assert!(reason.contains("oldest commit is 2024-03-01"), "{reason}");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(git.reset_count(), 0);
    }

    #[tokio::test]
    async fn reset_failure_is_rollback_skip() {
        let dir = tempfile::tempdir().unwrap();
        let git = Arc::new(MockGit::new());
        let d = descriptor("hw1-z", datetime!(2024-01-01 00:00 UTC));
        git.add_repo(
            &d.clone_url,
            five_commits().fail_reset("error: Your local changes would be overwritten"),
        );
        let c = ctx(dir.path(), git, MockHost::new().repo(d.clone(), 5));
        let out = run_repo_task(&c, &job(&d)).await;
        assert!(matches!(out, RepoOutcome::SkippedRollbackFailed { .. }));
        assert_eq!(out.stage(), Some(Stage::Rollback));
    }

    #[tokio::test]
    async fn unknown_branch_is_resolve_skip() {
        let dir = tempfile::tempdir().unwrap();
        let git = Arc::new(MockGit::new());
        let mut d = descriptor("hw1-m", datetime!(2024-01-01 00:00 UTC));
        git.add_repo(&d.clone_url, five_commits());
        d.default_branch = "master".into();
        let c = ctx(dir.path(), git.clone(), MockHost::new().repo(d.clone(), 5));

        let out = run_repo_task(&c, &job(&d)).await;
        match &out {
            RepoOutcome::SkippedRollbackFailed { stage, reason } => {
                assert_eq!(*stage, Stage::Resolve);
                assert!(reason.contains("bad revision 'origin/master'"), "{reason}");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(git.reset_count(), 0);
    }

    #[tokio::test]
    async fn empty_summaries_are_ambiguous() {
        let dir = tempfile::tempdir().unwrap();
        let git = Arc::new(MockGit::new());
        let d = descriptor("hw1-e", datetime!(2024-01-01 00:00 UTC));
        git.add_repo(
            &d.clone_url,
            MockRepo::new("main").commit("c1c1c1c1", datetime!(2024-01-10 00:00 UTC), None),
        );
        let c = ctx(dir.path(), git, MockHost::new().repo(d.clone(), 1));
        let out = run_repo_task(&c, &job(&d)).await;
        assert!(matches!(out, RepoOutcome::SkippedStatsAmbiguous { .. }));
    }

    #[tokio::test]
    async fn log_diagnostic_is_unexpected() {
        let dir = tempfile::tempdir().unwrap();
        let git = Arc::new(MockGit::new());
        let d = descriptor("hw1-f", datetime!(2024-01-01 00:00 UTC));
        git.add_repo(
            &d.clone_url,
            five_commits().fail_log("fatal: bad object HEAD"),
        );
        let c = ctx(dir.path(), git, MockHost::new().repo(d.clone(), 5));
        let out = run_repo_task(&c, &job(&d)).await;
        assert!(matches!(
            out,
            RepoOutcome::Failed {
                stage: Stage::Stats,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn host_failure_is_unexpected() {
        let dir = tempfile::tempdir().unwrap();
        let git = Arc::new(MockGit::new());
        let d = descriptor("hw1-h", datetime!(2024-01-01 00:00 UTC));
        let c = ctx(
            dir.path(),
            git,
            MockHost::new().repo(d.clone(), 5).fail_count("hw1-h"),
        );
        let out = run_repo_task(&c, &job(&d)).await;
        assert!(out.is_failed());
        assert_eq!(out.stage(), Some(Stage::Eligibility));
    }

    #[tokio::test]
    async fn existing_checkout_uses_origin_head() {
        let dir = tempfile::tempdir().unwrap();
        let git = Arc::new(MockGit::new());
        let checkout = dir.path().join("hw1-Doe-Jane");
        std::fs::create_dir_all(&checkout).unwrap();
        git.add_repo("mock://hw1-jdoe", five_commits());
        git.with_checkout(&checkout, "mock://hw1-jdoe");
        let c = TaskContext {
            scm: git,
            host: None,
            moment: due(),
            assignment_dir: dir.path().to_path_buf(),
            bootstrap_authors: Vec::new(),
        };
        let job = RepoJob::Existing {
            display_name: "hw1-Doe-Jane".into(),
            dir: checkout,
        };
        assert_eq!(
            run_repo_task(&c, &job).await,
            RepoOutcome::Completed {
                average_insertions: 5.0
            }
        );
    }
}
