use crate::error::GitError;
use crate::SourceControl;
use rewind_core::{CommitId, TargetMoment};
use std::path::Path;

/// Result of looking up the commit that was current at the due moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(CommitId),
    /// Nothing on the ref is old enough. `oldest` is the root commit's date
    /// when it could be read.
    Absent { oldest: Option<String> },
}

impl Resolution {
    pub fn commit(&self) -> Option<&CommitId> {
        match self {
            Resolution::Found(id) => Some(id),
            Resolution::Absent { .. } => None,
        }
    }
}

/// Most recent commit on `git_ref` at or before `moment`, inclusive.
pub async fn resolve_commit(
    scm: &dyn SourceControl,
    dir: &Path,
    git_ref: &str,
    moment: &TargetMoment,
) -> Result<Resolution, GitError> {
    if let Some(id) = scm.rev_list_before(dir, git_ref, moment).await? {
        tracing::debug!(dir = %dir.display(), commit = id.short(), "resolved");
        return Ok(Resolution::Found(id));
    }
    // Only feeds the skip message; a failure here must not mask the absence.
    let oldest = match scm.oldest_commit_date(dir, git_ref).await {
        Ok(date) => date,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "oldest commit lookup failed");
            None
        }
    };
    Ok(Resolution::Absent { oldest })
}
