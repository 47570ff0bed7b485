//! Structured event log for fleet runs.
//!
//! Append-only JSONL at `<assignment>/.rewind/events.jsonl`. Best-effort: a
//! write failure never affects the run.

use rewind_core::RepoOutcome;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

// ── Event types ──

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Clone,
    Rollback,
}

/// Serialized as tagged JSON (`"type": "run_start"`, etc.).
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    RunStart {
        assignment: String,
        mode: RunMode,
        due: String,
        repo_count: usize,
        max_concurrency: usize,
    },
    RepoFinished {
        repo: String,
        display_name: String,
        result: RepoOutcome,
    },
    RunFinished {
        attempted: usize,
        completed: usize,
        skipped: usize,
        failed: usize,
        compromised: bool,
    },
    RunInterrupted {
        finished: usize,
        pending: usize,
    },
}

/// Adds run id, sequence number and timestamp to each event.
#[derive(Debug, Serialize)]
pub struct FullEvent<'a> {
    pub run_id: &'a str,
    pub seq: u32,
    pub ts: String,
    #[serde(flatten)]
    pub event: Event,
}

// ── EventLogger ──

pub struct EventLogger {
    jsonl_path: PathBuf,
    run_id: String,
    seq: u32,
}

impl EventLogger {
    /// Logger for a fresh run with a new ULID run id.
    pub fn new(jsonl_path: PathBuf) -> Self {
        Self {
            jsonl_path,
            run_id: ulid::Ulid::new().to_string().to_lowercase(),
            seq: 0,
        }
    }

    /// Logger that writes nowhere, for callers that do not keep a log.
    pub fn disabled() -> Self {
        Self::new(PathBuf::new())
    }

    pub fn path(&self) -> &Path {
        &self.jsonl_path
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn record(&mut self, event: Event) {
        let full = FullEvent {
            run_id: &self.run_id,
            seq: self.seq,
            ts: now_rfc3339(),
            event,
        };
        self.seq += 1;

        if self.jsonl_path.as_os_str().is_empty() {
            return;
        }
        match serde_json::to_string(&full) {
            Ok(line) => {
                if let Err(e) = append_line(&self.jsonl_path, &line) {
                    tracing::debug!(path = %self.jsonl_path.display(), error = %e, "event log write failed");
                }
            }
            Err(e) => tracing::debug!(error = %e, "event serialization failed"),
        }
    }
}

/// Append a single line to a file, creating parent dirs if needed.
fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
