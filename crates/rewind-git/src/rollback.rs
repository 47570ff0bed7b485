use crate::error::GitError;
use crate::SourceControl;
use rewind_core::CommitId;
use std::path::Path;

/// Force the checkout in `dir` to exactly `commit`, then confirm HEAD moved.
///
/// Safe to repeat with the same commit.
pub async fn rollback_to(
    scm: &dyn SourceControl,
    dir: &Path,
    commit: &CommitId,
) -> Result<(), GitError> {
    scm.reset_hard(dir, commit).await?;
    let head = scm.head(dir).await?;
    if head.as_ref() != Some(commit) {
        return Err(GitError::UnexpectedOutput {
            op: "reset",
            detail: format!(
                "HEAD is {} after reset to {}",
                head.as_ref().map(CommitId::as_str).unwrap_or("unborn"),
                commit
            ),
        });
    }
    tracing::debug!(dir = %dir.display(), commit = commit.short(), "rolled back");
    Ok(())
}
