//! Fleet orchestration: one pipeline per repository, run concurrently,
//! folded into a results table and a report.

pub mod discover;
pub mod event_log;
pub mod fleet;
pub mod notify;
pub mod report;
pub mod results;
pub mod task;

pub use discover::{plan_clone_jobs, plan_existing_jobs};
pub use event_log::{Event, EventLogger, RunMode};
pub use fleet::{FleetError, FleetOrchestrator, FleetOutput, FleetSettings, FleetSummary};
pub use notify::{CollectNotifier, Notifier, StdoutNotifier};
pub use report::{render_report, write_report};
pub use results::{DuplicateKey, ResultsTable};
pub use task::{run_repo_task, RepoJob, TaskContext};
