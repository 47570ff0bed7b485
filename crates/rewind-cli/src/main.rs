mod cmd_config;
mod cmd_run;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "rewind",
    version,
    about = "Clone assignment repositories, roll them back to the due date and report average insertions"
)]
struct Cli {
    /// Debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Clone every repository of an assignment and measure it at the due moment
    Run {
        /// Assignment name; repositories whose name contains it are included
        assignment: String,
        #[command(flatten)]
        due: DueArgs,
        /// GitHub organization (overrides config)
        #[arg(long)]
        org: Option<String>,
        /// Classroom roster CSV (overrides config)
        #[arg(long)]
        roster: Option<PathBuf>,
        /// Ignore any configured roster and keep repository names
        #[arg(long, conflicts_with = "roster")]
        no_roster: bool,
        /// Read repositories from a JSON manifest instead of GitHub
        #[arg(long)]
        manifest: Option<PathBuf>,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Roll back the checkouts already in an assignment folder and re-measure them
    Rollback {
        /// Assignment folder name under the output directory
        assignment: String,
        #[command(flatten)]
        due: DueArgs,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Manage .rewind/config.json
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },
}

#[derive(clap::Args)]
struct DueArgs {
    /// Due date, yyyy-mm-dd (default: today)
    #[arg(long)]
    date: Option<String>,
    /// Due time, 24h HH:MM (default: now)
    #[arg(long)]
    time: Option<String>,
    /// UTC offset of the due moment, e.g. -05:00 (overrides config)
    #[arg(long, allow_hyphen_values = true)]
    offset: Option<String>,
}

#[derive(clap::Args)]
struct CommonArgs {
    /// Parent directory of assignment folders (overrides config)
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Maximum repositories processed at once (overrides config)
    #[arg(long)]
    concurrency: Option<usize>,
    /// git executable (overrides config)
    #[arg(long)]
    git: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ConfigCmd {
    /// Set a config value
    Set {
        /// Config key (e.g. organization)
        key: String,
        /// Config value
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
}

/// How a fleet run ended, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Clean,
    Compromised,
    Interrupted,
}

impl RunStatus {
    fn exit_code(self) -> ExitCode {
        match self {
            RunStatus::Clean => ExitCode::SUCCESS,
            RunStatus::Compromised => ExitCode::from(2),
            RunStatus::Interrupted => ExitCode::from(130),
        }
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("info,rewind=debug,rewind_conductor=debug,rewind_git=debug,rewind_hub=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dispatch(cli.cmd) {
        Ok(status) => status.exit_code(),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn dispatch(cmd: Command) -> anyhow::Result<RunStatus> {
    let cwd = std::env::current_dir()?;

    match cmd {
        Command::Run {
            assignment,
            due,
            org,
            roster,
            no_roster,
            manifest,
            common,
        } => cmd_run::execute(cmd_run::RunParams {
            cwd: &cwd,
            assignment: &assignment,
            date: due.date.as_deref(),
            time: due.time.as_deref(),
            offset: due.offset.as_deref(),
            mode: cmd_run::Mode::Clone {
                org,
                roster,
                no_roster,
                manifest,
            },
            output_dir: common.output_dir,
            concurrency: common.concurrency,
            git_bin: common.git,
        }),
        Command::Rollback {
            assignment,
            due,
            common,
        } => cmd_run::execute(cmd_run::RunParams {
            cwd: &cwd,
            assignment: &assignment,
            date: due.date.as_deref(),
            time: due.time.as_deref(),
            offset: due.offset.as_deref(),
            mode: cmd_run::Mode::Rollback,
            output_dir: common.output_dir,
            concurrency: common.concurrency,
            git_bin: common.git,
        }),
        Command::Config { cmd } => {
            match cmd {
                ConfigCmd::Set { key, value } => cmd_config::set(&cwd, &key, &value),
                ConfigCmd::Get { key } => cmd_config::get(&cwd, &key),
                ConfigCmd::List => cmd_config::list(&cwd),
            }?;
            Ok(RunStatus::Clean)
        }
    }
}
