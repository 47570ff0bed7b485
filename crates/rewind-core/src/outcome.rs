use serde::{Deserialize, Serialize};
use std::fmt;

// ── Stages ──

/// Pipeline stage a repository task was in when it stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Eligibility,
    Clone,
    Resolve,
    Rollback,
    Stats,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Eligibility => "eligibility",
            Stage::Clone => "clone",
            Stage::Resolve => "resolve",
            Stage::Rollback => "rollback",
            Stage::Stats => "stats",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Outcomes ──

/// Terminal state of one repository task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RepoOutcome {
    Completed { average_insertions: f64 },
    SkippedNoCommits,
    SkippedCreatedAfterDeadline { created_at: String },
    SkippedCloneFailed { reason: String },
    /// `stage` is [`Stage::Resolve`] or [`Stage::Rollback`].
    SkippedRollbackFailed { stage: Stage, reason: String },
    SkippedStatsAmbiguous { reason: String },
    Failed { stage: Stage, error: String },
}

/// Payload-free discriminant, used for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutcomeKind {
    Completed,
    SkippedNoCommits,
    SkippedCreatedAfterDeadline,
    SkippedCloneFailed,
    SkippedRollbackFailed,
    SkippedStatsAmbiguous,
    Failed,
}

impl OutcomeKind {
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeKind::Completed => "completed",
            OutcomeKind::SkippedNoCommits => "no commits",
            OutcomeKind::SkippedCreatedAfterDeadline => "created after due date",
            OutcomeKind::SkippedCloneFailed => "clone failed",
            OutcomeKind::SkippedRollbackFailed => "rollback failed",
            OutcomeKind::SkippedStatsAmbiguous => "stats ambiguous",
            OutcomeKind::Failed => "unexpected failure",
        }
    }
}

impl RepoOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            RepoOutcome::Completed { .. } => OutcomeKind::Completed,
            RepoOutcome::SkippedNoCommits => OutcomeKind::SkippedNoCommits,
            RepoOutcome::SkippedCreatedAfterDeadline { .. } => {
                OutcomeKind::SkippedCreatedAfterDeadline
            }
            RepoOutcome::SkippedCloneFailed { .. } => OutcomeKind::SkippedCloneFailed,
            RepoOutcome::SkippedRollbackFailed { .. } => OutcomeKind::SkippedRollbackFailed,
            RepoOutcome::SkippedStatsAmbiguous { .. } => OutcomeKind::SkippedStatsAmbiguous,
            RepoOutcome::Failed { .. } => OutcomeKind::Failed,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RepoOutcome::Completed { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RepoOutcome::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        !self.is_completed() && !self.is_failed()
    }

    pub fn average_insertions(&self) -> Option<f64> {
        match self {
            RepoOutcome::Completed { average_insertions } => Some(*average_insertions),
            _ => None,
        }
    }

    /// Stage at which the pipeline stopped; `None` when it ran to completion.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RepoOutcome::Completed { .. } => None,
            RepoOutcome::SkippedNoCommits | RepoOutcome::SkippedCreatedAfterDeadline { .. } => {
                Some(Stage::Eligibility)
            }
            RepoOutcome::SkippedCloneFailed { .. } => Some(Stage::Clone),
            RepoOutcome::SkippedRollbackFailed { stage, .. } => Some(*stage),
            RepoOutcome::SkippedStatsAmbiguous { .. } => Some(Stage::Stats),
            RepoOutcome::Failed { stage, .. } => Some(*stage),
        }
    }

    /// Human-readable reason for a skip or failure.
    pub fn reason(&self) -> Option<String> {
        match self {
            RepoOutcome::Completed { .. } => None,
            RepoOutcome::SkippedNoCommits => Some("repository has 0 commits".into()),
            RepoOutcome::SkippedCreatedAfterDeadline { created_at } => {
                Some(format!("repository was created after the due date ({created_at})"))
            }
            RepoOutcome::SkippedCloneFailed { reason }
            | RepoOutcome::SkippedRollbackFailed { reason, .. }
            | RepoOutcome::SkippedStatsAmbiguous { reason } => Some(reason.clone()),
            RepoOutcome::Failed { error, .. } => Some(error.clone()),
        }
    }
}

/// Round to the two decimals used in reports.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
