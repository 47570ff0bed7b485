use crate::error::ConfigError;
use crate::moment::parse_utc_offset;
use crate::types::DEFAULT_MAX_CONCURRENCY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::UtcOffset;

/// Default GitHub REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Author login GitHub Classroom uses for the commit it creates when provisioning a repo.
pub const CLASSROOM_BOT: &str = "github-classroom[bot]";

/// Location of the config file relative to the working directory.
pub fn config_path(cwd: &Path) -> PathBuf {
    cwd.join(".rewind").join("config.json")
}

/// Settings read from `.rewind/config.json`. Every key is optional on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RewindConfig {
    /// GitHub organization that owns the assignment repositories.
    pub organization: Option<String>,
    /// Classroom roster CSV used to pick display names.
    pub roster_path: Option<PathBuf>,
    /// Parent directory for assignment folders. Defaults to the working directory.
    pub output_dir: Option<PathBuf>,
    /// Offset used for the due moment and the created-after-due comparison.
    pub utc_offset: String,
    pub max_concurrency: usize,
    /// Commit authors that never count towards a repository's commit total.
    pub bootstrap_authors: Vec<String>,
    pub git_bin: PathBuf,
    pub api_base: String,
}

impl Default for RewindConfig {
    fn default() -> Self {
        Self {
            organization: None,
            roster_path: None,
            output_dir: None,
            utc_offset: "+00:00".into(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            bootstrap_authors: vec![CLASSROOM_BOT.into()],
            git_bin: PathBuf::from("git"),
            api_base: DEFAULT_API_BASE.into(),
        }
    }
}

impl RewindConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        parse_utc_offset(&self.utc_offset)?;
        Ok(())
    }

    pub fn utc_offset(&self) -> Result<UtcOffset, ConfigError> {
        parse_utc_offset(&self.utc_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::offset;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RewindConfig::load(&config_path(dir.path())).unwrap();
        assert_eq!(cfg, RewindConfig::default());
        assert_eq!(cfg.max_concurrency, DEFAULT_MAX_CONCURRENCY);
        assert_eq!(cfg.bootstrap_authors, vec![CLASSROOM_BOT.to_string()]);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"organization": "cs-101", "utc_offset": "-05:00", "max_concurrency": 8}"#,
        )
        .unwrap();
        let cfg = RewindConfig::load(&path).unwrap();
        assert_eq!(cfg.organization.as_deref(), Some("cs-101"));
        assert_eq!(cfg.max_concurrency, 8);
        assert_eq!(cfg.utc_offset().unwrap(), offset!(-5));
        assert_eq!(cfg.git_bin, PathBuf::from("git"));
    }

    #[test]
    fn zero_concurrency_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"max_concurrency": 0}"#).unwrap();
        assert!(matches!(
            RewindConfig::load(&path),
            Err(ConfigError::InvalidConcurrency)
        ));
    }

    #[test]
    fn bad_offset_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"utc_offset": "EST"}"#).unwrap();
        assert!(matches!(
            RewindConfig::load(&path),
            Err(ConfigError::InvalidOffset(_))
        ));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            RewindConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
