use crate::diagnostic::DiagnosticKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
    /// The tool could not be started at all.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool printed an `error:`/`warning:`/`fatal:` line.
    #[error("git {op}: {line}")]
    Diagnostic {
        op: &'static str,
        kind: DiagnosticKind,
        line: String,
    },

    #[error("git {op} exited with status {code}: {stderr}")]
    Exit {
        op: &'static str,
        code: i32,
        stderr: String,
    },

    #[error("git {op} produced unexpected output: {detail}")]
    UnexpectedOutput { op: &'static str, detail: String },

    #[error("git {found} is too old; version {required} or newer is required")]
    TooOld { found: String, required: String },
}

impl GitError {
    /// True when git itself ran and reported the failure, as opposed to the
    /// process never starting or behaving in a way we cannot interpret.
    pub fn is_tool_report(&self) -> bool {
        matches!(self, GitError::Diagnostic { .. } | GitError::Exit { .. })
    }
}

/// Problems reading a history summary that make its average untrustworthy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatsError {
    #[error("history has no commit summary lines to average")]
    NoSummaries,

    #[error("commit summary line does not match the expected shape: {line:?}")]
    Malformed { line: String },
}
