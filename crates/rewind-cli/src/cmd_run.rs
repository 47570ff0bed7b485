use crate::RunStatus;
use anyhow::{bail, Context, Result};
use rewind_conductor::{
    plan_clone_jobs, plan_existing_jobs, write_report, EventLogger, FleetError,
    FleetOrchestrator, FleetOutput, FleetSettings, FleetSummary, RunMode, StdoutNotifier,
};
use rewind_core::{config_path, parse_utc_offset, RewindConfig, TargetMoment};
use rewind_git::GitCli;
use rewind_hub::{GitHubHost, ManifestHost, RepoHost};
use rewind_roster::Roster;
use rewind_store::{
    assignment_dir, events_path, prepare_assignment_dir, run_lock_path, try_lock_run,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub enum Mode {
    Clone {
        org: Option<String>,
        roster: Option<PathBuf>,
        no_roster: bool,
        manifest: Option<PathBuf>,
    },
    Rollback,
}

pub struct RunParams<'a> {
    pub cwd: &'a Path,
    pub assignment: &'a str,
    pub date: Option<&'a str>,
    pub time: Option<&'a str>,
    pub offset: Option<&'a str>,
    pub mode: Mode,
    pub output_dir: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub git_bin: Option<PathBuf>,
}

/// `rewind run` and `rewind rollback`.
pub fn execute(params: RunParams<'_>) -> Result<RunStatus> {
    let assignment = params.assignment.trim();
    if assignment.is_empty() || assignment.contains(['/', '\\']) || assignment.starts_with('.') {
        bail!("invalid assignment name {:?}", params.assignment);
    }

    // ── Settings: flags over file over defaults ──
    let mut cfg = RewindConfig::load(&config_path(params.cwd))?;
    if let Some(o) = params.offset {
        cfg.utc_offset = o.to_string();
    }
    if let Some(n) = params.concurrency {
        cfg.max_concurrency = n;
    }
    if let Some(g) = params.git_bin {
        cfg.git_bin = g;
    }
    if let Some(d) = params.output_dir {
        cfg.output_dir = Some(d);
    }
    cfg.validate()?;
    let offset = parse_utc_offset(&cfg.utc_offset)?;
    let moment = TargetMoment::parse_or_now(params.date, params.time, offset)?;
    let output_dir = cfg
        .output_dir
        .clone()
        .map(|d| if d.is_absolute() { d } else { params.cwd.join(d) })
        .unwrap_or_else(|| params.cwd.to_path_buf());
    let dir = assignment_dir(&output_dir, assignment);

    let rt = tokio::runtime::Runtime::new()?;
    let git = GitCli::with_bin(cfg.git_bin.clone());
    let version = rt
        .block_on(git.verify_available())
        .context("git is required")?;
    tracing::debug!(%version, "git found");

    let run_mode = match params.mode {
        Mode::Clone { .. } => RunMode::Clone,
        Mode::Rollback => RunMode::Rollback,
    };
    let settings = FleetSettings {
        assignment: assignment.to_string(),
        assignment_dir: dir.clone(),
        moment,
        max_concurrency: cfg.max_concurrency,
        bootstrap_authors: cfg.bootstrap_authors.clone(),
        mode: run_mode,
    };
    let mut fleet = FleetOrchestrator::new(Arc::new(git), Arc::new(StdoutNotifier), settings);

    // ── Preconditions: all checked before anything on disk changes ──
    let _lock = try_lock_run(&run_lock_path(&dir))?;
    let jobs = match params.mode {
        Mode::Clone {
            org,
            roster,
            no_roster,
            manifest,
        } => {
            let roster_path = if no_roster {
                None
            } else {
                roster.or_else(|| cfg.roster_path.clone())
            };
            let roster = roster_path.map(|p| Roster::load(&p)).transpose()?;
            if let Some(r) = &roster {
                tracing::debug!(members = r.len(), "roster loaded");
            }
            let host: Arc<dyn RepoHost> = match manifest {
                Some(path) => Arc::new(ManifestHost::load(&path)?),
                None => {
                    let Some(org) = org.or_else(|| cfg.organization.clone()) else {
                        bail!(
                            "no organization: pass --org, run `rewind config set organization <name>`, or use --manifest"
                        );
                    };
                    Arc::new(GitHubHost::from_env(&cfg.api_base, &org)?)
                }
            };
            let jobs = rt.block_on(plan_clone_jobs(host.as_ref(), assignment, roster.as_ref()))?;
            fleet = fleet.with_host(host);
            prepare_assignment_dir(&dir)?;
            jobs
        }
        Mode::Rollback => {
            if !dir.is_dir() {
                bail!(
                    "assignment folder {} does not exist; clone it with `rewind run` first",
                    dir.display()
                );
            }
            plan_existing_jobs(&dir)?
        }
    };
    if jobs.is_empty() {
        println!("No repositories found for {assignment}.");
    }

    // ── Run ──
    let cancel = CancellationToken::new();
    ctrlc_cancel(cancel.clone());
    let mut events = EventLogger::new(events_path(&dir));
    let result = rt.block_on(fleet.run(jobs, &mut events, cancel));
    // Drop any child processes still held by aborted tasks before returning.
    drop(rt);

    match result {
        Ok(output) => finish(&dir, assignment, &output, &events),
        Err(FleetError::Interrupted { finished, pending }) => {
            eprintln!(
                "Interrupted after {finished} of {} repositories.",
                finished + pending
            );
            eprintln!(
                "Repositories in {} may not be at the due moment. Delete the folder and run again.",
                dir.display()
            );
            eprintln!(
                "Event log: {} (run {})",
                events.path().display(),
                events.run_id()
            );
            Ok(RunStatus::Interrupted)
        }
        Err(e) => Err(e.into()),
    }
}

fn finish(
    dir: &Path,
    assignment: &str,
    output: &FleetOutput,
    events: &EventLogger,
) -> Result<RunStatus> {
    let report = write_report(dir, assignment, &output.table)
        .with_context(|| format!("writing report under {}", dir.display()))?;
    print!("{}", render_summary(&output.summary, dir));
    println!("Report: {}", report.display());
    println!(
        "Event log: {} (run {})",
        events.path().display(),
        events.run_id()
    );

    if output.summary.is_compromised() {
        eprintln!(
            "Run compromised: {} repositories failed unexpectedly. See the event log for details.",
            output.summary.failed
        );
        return Ok(RunStatus::Compromised);
    }
    Ok(RunStatus::Clean)
}

fn render_summary(summary: &FleetSummary, dir: &Path) -> String {
    let mut out = format!(
        "\n{} repository folders in {}\n",
        summary.cloned,
        dir.display()
    );
    out.push_str(&format!("Attempted: {}\n", summary.attempted));
    out.push_str(&format!("Completed: {}\n", summary.completed));
    out.push_str(&format!("Skipped:   {}\n", summary.skipped_total()));
    for (kind, n) in &summary.skipped {
        out.push_str(&format!("  {}: {n}\n", kind.label()));
    }
    out.push_str(&format!("Failed:    {}\n", summary.failed));
    out
}

fn ctrlc_cancel(cancel: CancellationToken) {
    let _ = ctrlc::set_handler(move || {
        cancel.cancel();
    });
}
