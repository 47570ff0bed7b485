pub mod config;
pub mod error;
pub mod moment;
pub mod outcome;
pub mod types;

pub use config::{config_path, RewindConfig};
pub use error::{ConfigError, MomentError};
pub use moment::{format_git_date, parse_utc_offset, TargetMoment};
pub use outcome::{round2, OutcomeKind, RepoOutcome, Stage};
pub use types::*;
