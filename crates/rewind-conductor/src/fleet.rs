use crate::discover::check_unique;
use crate::event_log::{Event, EventLogger, RunMode};
use crate::notify::{progress_line, Notifier};
use crate::results::ResultsTable;
use crate::task::{lost_outcome, run_repo_task, RepoJob, TaskContext};
use rewind_core::{OutcomeKind, RepoOutcome, Stage, TargetMoment};
use rewind_git::SourceControl;
use rewind_hub::{HubError, RepoHost};
use rewind_roster::RosterError;
use rewind_store::StoreError;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum FleetError {
    #[error(transparent)]
    Input(#[from] RosterError),

    #[error("repository discovery failed: {0}")]
    Discovery(#[from] HubError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("interrupted: {finished} repositories finished, {pending} did not")]
    Interrupted { finished: usize, pending: usize },
}

// ── Summary ──

/// Aggregate counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FleetSummary {
    pub attempted: usize,
    pub completed: usize,
    pub skipped: BTreeMap<OutcomeKind, usize>,
    pub failed: usize,
    /// Repository folders present in the assignment directory afterwards.
    pub cloned: usize,
}

impl FleetSummary {
    fn record(&mut self, outcome: &RepoOutcome) {
        match outcome {
            RepoOutcome::Completed { .. } => self.completed += 1,
            RepoOutcome::Failed { .. } => self.failed += 1,
            other => *self.skipped.entry(other.kind()).or_default() += 1,
        }
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    /// At least one repository hit an unexpected failure.
    pub fn is_compromised(&self) -> bool {
        self.failed > 0
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct FleetOutput {
    pub summary: FleetSummary,
    pub table: ResultsTable,
    /// Display name → outcome, for every job.
    pub outcomes: BTreeMap<String, RepoOutcome>,
}

// ── Orchestrator ──

#[derive(Debug, Clone)]
pub struct FleetSettings {
    pub assignment: String,
    pub assignment_dir: PathBuf,
    pub moment: TargetMoment,
    pub max_concurrency: usize,
    pub bootstrap_authors: Vec<String>,
    pub mode: RunMode,
}

/// Runs one [`RepoJob`] per repository on a bounded pool and gathers the results.
pub struct FleetOrchestrator {
    scm: Arc<dyn SourceControl>,
    host: Option<Arc<dyn RepoHost>>,
    notifier: Arc<dyn Notifier>,
    settings: FleetSettings,
}

impl FleetOrchestrator {
    pub fn new(
        scm: Arc<dyn SourceControl>,
        notifier: Arc<dyn Notifier>,
        settings: FleetSettings,
    ) -> Self {
        Self {
            scm,
            host: None,
            notifier,
            settings,
        }
    }

    /// Host used for commit counts; required for [`RepoJob::Clone`] jobs.
    pub fn with_host(mut self, host: Arc<dyn RepoHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Run every job to a terminal outcome.
    ///
    /// Each task posts exactly one `(index, outcome)` message; this function
    /// is the only reader and the only writer of the results table. When
    /// `cancel` fires, queued tasks never start, running ones are dropped
    /// (killing their child processes) and [`FleetError::Interrupted`] is
    /// returned.
    pub async fn run(
        &self,
        jobs: Vec<RepoJob>,
        events: &mut EventLogger,
        cancel: CancellationToken,
    ) -> Result<FleetOutput, FleetError> {
        check_unique(&jobs)?;
        let total = jobs.len();
        let s = &self.settings;
        events.record(Event::RunStart {
            assignment: s.assignment.clone(),
            mode: s.mode,
            due: s.moment.to_string(),
            repo_count: total,
            max_concurrency: s.max_concurrency,
        });
        self.notifier
            .notify(&format!(
                "{} repositories for {} (due {}, up to {} at a time)",
                total, s.assignment, s.moment, s.max_concurrency
            ))
            .await;

        let ctx = Arc::new(TaskContext {
            scm: self.scm.clone(),
            host: self.host.clone(),
            moment: s.moment,
            assignment_dir: s.assignment_dir.clone(),
            bootstrap_authors: s.bootstrap_authors.clone(),
        });
        let permits = Arc::new(Semaphore::new(s.max_concurrency.max(1)));
        let (tx, mut rx) = mpsc::channel::<(usize, RepoOutcome)>(total.max(1));
        let mut set = JoinSet::new();

        for (idx, job) in jobs.iter().cloned().enumerate() {
            let ctx = ctx.clone();
            let permits = permits.clone();
            let tx = tx.clone();
            let cancel = cancel.clone();
            set.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                if cancel.is_cancelled() {
                    return;
                }
                let outcome = run_repo_task(&ctx, &job).await;
                let _ = tx.send((idx, outcome)).await;
            });
        }
        drop(tx);

        let mut outcomes: Vec<Option<RepoOutcome>> = vec![None; total];
        let mut table = ResultsTable::new();
        let mut finished = 0;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    set.shutdown().await;
                    let pending = total - finished;
                    tracing::warn!(finished, pending, "run interrupted");
                    events.record(Event::RunInterrupted { finished, pending });
                    return Err(FleetError::Interrupted { finished, pending });
                }
                msg = rx.recv() => {
                    let Some((idx, mut outcome)) = msg else { break };
                    let job = &jobs[idx];
                    if let Some(avg) = outcome.average_insertions() {
                        if let Err(e) = table.insert(job.display_name(), avg) {
                            tracing::error!(repo = job.repo_name(), error = %e, "results key collision");
                            outcome = RepoOutcome::Failed {
                                stage: Stage::Stats,
                                error: e.to_string(),
                            };
                        }
                    }
                    finished += 1;
                    self.notifier
                        .notify(&progress_line(finished, total, job.display_name(), &outcome))
                        .await;
                    events.record(Event::RepoFinished {
                        repo: job.repo_name().to_string(),
                        display_name: job.display_name().to_string(),
                        result: outcome.clone(),
                    });
                    outcomes[idx] = Some(outcome);
                }
            }
        }

        while let Some(res) = set.join_next().await {
            if let Err(e) = res {
                tracing::error!(error = %e, "repository task did not finish cleanly");
            }
        }

        let mut summary = FleetSummary {
            attempted: total,
            ..Default::default()
        };
        let mut by_name = BTreeMap::new();
        for (job, outcome) in jobs.iter().zip(outcomes) {
            let outcome = outcome.unwrap_or_else(|| {
                let lost = lost_outcome(job);
                tracing::error!(repo = job.repo_name(), "no outcome reported");
                events.record(Event::RepoFinished {
                    repo: job.repo_name().to_string(),
                    display_name: job.display_name().to_string(),
                    result: lost.clone(),
                });
                lost
            });
            summary.record(&outcome);
            by_name.insert(job.display_name().to_string(), outcome);
        }
        summary.cloned = match rewind_store::list_repo_dirs(&s.assignment_dir) {
            Ok(dirs) => dirs.len(),
            Err(e) => {
                tracing::warn!(error = %e, "could not count repository folders");
                0
            }
        };

        events.record(Event::RunFinished {
            attempted: summary.attempted,
            completed: summary.completed,
            skipped: summary.skipped_total(),
            failed: summary.failed,
            compromised: summary.is_compromised(),
        });
        Ok(FleetOutput {
            summary,
            table,
            outcomes: by_name,
        })
    }
}
