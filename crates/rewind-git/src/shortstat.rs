use crate::error::{GitError, StatsError};
use crate::SourceControl;
use regex::Regex;
use rewind_core::{round2, CommitStat};
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

// ── Grammar ──

static SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(\d+) files? changed(?:, (\d+) insertions?\(\+\))?(?:, (\d+) deletions?\(-\))?\s*$",
    )
    .unwrap()
});

/// Anything that opens like a summary line.
static CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+ files? changed").unwrap());

/// Parse one `--shortstat` summary line.
///
/// `Ok(None)` means the line is not a summary at all (a one-line commit
/// header, a blank line). A line that starts like a summary but does not fit
/// the grammar is an error rather than being skipped.
pub fn parse_summary_line(line: &str) -> Result<Option<CommitStat>, StatsError> {
    if !CANDIDATE.is_match(line) {
        return Ok(None);
    }
    let caps = SUMMARY
        .captures(line)
        .ok_or_else(|| StatsError::Malformed {
            line: line.trim().to_string(),
        })?;
    let number = |i: usize| -> Result<Option<u32>, StatsError> {
        caps.get(i)
            .map(|m| {
                m.as_str().parse::<u32>().map_err(|_| StatsError::Malformed {
                    line: line.trim().to_string(),
                })
            })
            .transpose()
    };
    let files_changed = number(1)?.unwrap_or(0);
    let insertions = number(2)?;
    let deletions = number(3)?;
    Ok(insertions.map(|insertions| CommitStat {
        files_changed,
        insertions,
        deletions,
    }))
}

// ── Summary ──

/// Insertion totals over the commits that reported any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionStats {
    pub commits: u32,
    pub total_insertions: u64,
}

impl InsertionStats {
    /// Mean insertions per counted commit, rounded to two decimals.
    pub fn average(&self) -> f64 {
        if self.commits == 0 {
            return 0.0;
        }
        round2(self.total_insertions as f64 / f64::from(self.commits))
    }
}

/// Average the insertion counts of a `git log --oneline --shortstat` listing.
///
/// Commits without a summary line (empty commits) and summaries without an
/// insertion count (deletion-only changes) are not counted.
pub fn summarize(log: &str) -> Result<InsertionStats, StatsError> {
    let mut stats = InsertionStats {
        commits: 0,
        total_insertions: 0,
    };
    for line in log.lines() {
        if let Some(stat) = parse_summary_line(line)? {
            stats.commits += 1;
            stats.total_insertions += u64::from(stat.insertions);
        }
    }
    if stats.commits == 0 {
        return Err(StatsError::NoSummaries);
    }
    Ok(stats)
}

#[derive(Debug, Error)]
pub enum StatsFailure {
    #[error(transparent)]
    Git(#[from] GitError),
    #[error(transparent)]
    Ambiguous(#[from] StatsError),
}

/// Read the history at the current HEAD of `dir` and average it.
pub async fn extract_stats(
    scm: &dyn SourceControl,
    dir: &Path,
) -> Result<InsertionStats, StatsFailure> {
    let log = scm.shortstat_log(dir).await?;
    Ok(summarize(&log)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_summary_line() {
        let stat = parse_summary_line(" 3 files changed, 12 insertions(+), 4 deletions(-)")
            .unwrap()
            .unwrap();
        assert_eq!(
            stat,
            CommitStat {
                files_changed: 3,
                insertions: 12,
                deletions: Some(4)
            }
        );
    }

    #[test]
    fn singular_forms() {
        let stat = parse_summary_line(" 1 file changed, 1 insertion(+)")
            .unwrap()
            .unwrap();
        assert_eq!(stat.insertions, 1);
        assert_eq!(stat.deletions, None);
    }

    #[test]
    fn deletion_only_is_not_counted() {
        assert_eq!(
            parse_summary_line(" 1 file changed, 7 deletions(-)").unwrap(),
            None
        );
    }

    #[test]
    fn headers_are_not_summaries() {
        assert_eq!(parse_summary_line("a1b2c3d add 3 files changed"), Ok(None));
        assert_eq!(parse_summary_line(""), Ok(None));
    }

    #[test]
    fn garbled_summary_is_ambiguous() {
        let err = parse_summary_line(" 2 files changed, lots of insertions(+)").unwrap_err();
        assert!(matches!(err, StatsError::Malformed { .. }));
    }

    #[test]
    fn averages_commits_with_insertions() {
        let log = "\
c3c3c3c third
 1 file changed, 10 insertions(+)
b2b2b2b empty
a1a1a1a first
 1 file changed, 4 insertions(+)
";
        let stats = summarize(log).unwrap();
        assert_eq!(stats.commits, 2);
        assert_eq!(stats.total_insertions, 14);
        assert_eq!(stats.average(), 7.0);
    }

    #[test]
    fn average_rounds_to_two_places() {
        let log = " 1 file changed, 1 insertion(+)\n 1 file changed, 1 insertion(+)\n 1 file changed, 2 insertions(+)\n";
        assert_eq!(summarize(log).unwrap().average(), 1.33);
    }

    #[test]
    fn history_without_summaries_is_ambiguous() {
        assert_eq!(
            summarize("a1a1a1a empty\nb2b2b2b also empty\n"),
            Err(StatsError::NoSummaries)
        );
        assert_eq!(summarize(""), Err(StatsError::NoSummaries));
    }
}
