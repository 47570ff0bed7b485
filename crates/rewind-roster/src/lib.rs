//! Classroom roster: which GitHub user is which student, and what each
//! repository's folder and report entry should be called.

pub mod csv;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("classroom roster file {} not found", path.display())]
    NotFound { path: PathBuf },

    #[error("reading roster {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("roster line {line}: {detail}")]
    Malformed { line: usize, detail: String },

    #[error("repositories {first} and {second} both map to display name {display}")]
    DuplicateDisplayName {
        display: String,
        first: String,
        second: String,
    },
}

/// One linked student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub username: String,
    /// Roster identifier with `", "` turned into `-`, e.g. `Doe-Jane`.
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct Roster {
    /// File order.
    members: Vec<Member>,
}

impl Roster {
    /// Read a GitHub Classroom roster export:
    /// `"identifier","github_username","github_id","name"`.
    pub fn load(path: &Path) -> Result<Self, RosterError> {
        if !path.is_file() {
            return Err(RosterError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|source| RosterError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// The first non-blank line is the header and is skipped. Rows without
    /// both an identifier and a linked username are students who never
    /// accepted the assignment; they are left out.
    pub fn parse(text: &str) -> Result<Self, RosterError> {
        let mut members = Vec::new();
        let mut seen_header = false;
        for (idx, raw) in text.lines().enumerate() {
            if raw.trim().is_empty() {
                continue;
            }
            if !seen_header {
                seen_header = true;
                continue;
            }
            let fields = csv::split_record(raw).ok_or_else(|| RosterError::Malformed {
                line: idx + 1,
                detail: "unterminated quoted field".into(),
            })?;
            if fields.len() < 2 {
                return Err(RosterError::Malformed {
                    line: idx + 1,
                    detail: format!("expected at least 2 fields, found {}", fields.len()),
                });
            }
            let name = display_identifier(&fields[0]);
            let username = fields[1].trim().to_string();
            if name.is_empty() || username.is_empty() {
                tracing::debug!(line = idx + 1, "roster row without linked account");
                continue;
            }
            members.push(Member { username, name });
        }
        Ok(Self { members })
    }

    pub fn from_members(members: Vec<Member>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member whose username appears in `repo_name`.
    ///
    /// Matching ignores ASCII case. When several usernames appear (`sam` and
    /// `samuel` in `hw1-samuel`), the longest one wins.
    pub fn member_for(&self, repo_name: &str) -> Option<&Member> {
        let haystack = repo_name.to_ascii_lowercase();
        self.members
            .iter()
            .filter(|m| haystack.contains(&m.username.to_ascii_lowercase()))
            .max_by_key(|m| m.username.len())
    }

    pub fn is_member(&self, repo_name: &str) -> bool {
        self.member_for(repo_name).is_some()
    }

    /// `<assignment>-<name>` for a roster repository; `None` when no member matches.
    pub fn display_name(&self, repo_name: &str, assignment: &str) -> Option<String> {
        self.member_for(repo_name)
            .map(|m| format!("{assignment}-{}", m.name))
    }
}

/// `"Doe, Jane"` → `Doe-Jane`. Path separators are folded too, since the
/// result names a directory.
fn display_identifier(raw: &str) -> String {
    raw.trim()
        .replace(", ", "-")
        .replace(['/', '\\'], "-")
}

/// Reject two repositories that would share a folder and report key.
///
/// `pairs` yields `(repo_name, display_name)`.
pub fn check_collisions<'a, I>(pairs: I) -> Result<(), RosterError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for (repo, display) in pairs {
        if let Some(first) = seen.insert(display, repo) {
            return Err(RosterError::DuplicateDisplayName {
                display: display.to_string(),
                first: first.to_string(),
                second: repo.to_string(),
            });
        }
    }
    Ok(())
}
