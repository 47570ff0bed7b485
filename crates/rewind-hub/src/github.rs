use crate::{token_from_env, HubError, RepoHost};
use async_trait::async_trait;
use rewind_core::RepoDescriptor;
use serde::Deserialize;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

const PER_PAGE: usize = 100;
const TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("rewind/", env!("CARGO_PKG_VERSION"));

/// Lists an organization's repositories through the GitHub REST API.
pub struct GitHubHost {
    client: reqwest::Client,
    api_base: String,
    organization: String,
    token: String,
}

impl GitHubHost {
    pub fn new(api_base: &str, organization: &str, token: String) -> Result<Self, HubError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(TIMEOUT)
            .build()
            .map_err(|source| HubError::Http {
                url: api_base.to_string(),
                source,
            })?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            organization: organization.to_string(),
            token,
        })
    }

    /// Like [`GitHubHost::new`], taking the token from the environment.
    pub fn from_env(api_base: &str, organization: &str) -> Result<Self, HubError> {
        let token = token_from_env().ok_or(HubError::MissingToken)?;
        Self::new(api_base, organization, token)
    }

    /// GET one page. `Ok(None)` for 409, which GitHub uses for empty repositories.
    async fn get_page(&self, url: &str, page: usize) -> Result<Option<String>, HubError> {
        let resp = self
            .client
            .get(url)
            .query(&[("per_page", PER_PAGE), ("page", page)])
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|source| HubError::Http {
                url: url.to_string(),
                source,
            })?;
        let status = resp.status();
        if status.as_u16() == 409 {
            return Ok(None);
        }
        let body = resp.text().await.map_err(|source| HubError::Http {
            url: url.to_string(),
            source,
        })?;
        if !status.is_success() {
            return Err(HubError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        Ok(Some(body))
    }
}

#[async_trait]
impl RepoHost for GitHubHost {
    async fn list_repos(&self, filter: &str) -> Result<Vec<RepoDescriptor>, HubError> {
        let url = format!("{}/orgs/{}/repos", self.api_base, self.organization);
        let mut repos = Vec::new();
        for page in 1.. {
            let Some(body) = self.get_page(&url, page).await? else {
                break;
            };
            let batch = parse_repo_page(&url, &body)?;
            let full = batch.len() == PER_PAGE;
            repos.extend(batch.into_iter().filter(|r| r.name.contains(filter)));
            if !full {
                break;
            }
        }
        repos.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::debug!(org = %self.organization, filter, count = repos.len(), "listed repositories");
        Ok(repos)
    }

    async fn commit_count(
        &self,
        repo: &RepoDescriptor,
        excluded_authors: &[String],
    ) -> Result<u64, HubError> {
        let url = format!(
            "{}/repos/{}/{}/commits",
            self.api_base, self.organization, repo.name
        );
        let mut total = 0;
        for page in 1.. {
            let Some(body) = self.get_page(&url, page).await? else {
                break;
            };
            let (counted, seen) = count_attributable(&url, &body, excluded_authors)?;
            total += counted;
            if seen < PER_PAGE {
                break;
            }
        }
        Ok(total)
    }
}

// ── Response shapes ──

#[derive(Debug, Deserialize)]
struct GhRepo {
    name: String,
    clone_url: String,
    default_branch: Option<String>,
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct GhCommit {
    author: Option<GhUser>,
    commit: GhCommitDetail,
}

#[derive(Debug, Deserialize)]
struct GhUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GhCommitDetail {
    author: Option<GhSignature>,
}

#[derive(Debug, Deserialize)]
struct GhSignature {
    name: Option<String>,
}

fn decode_err(url: &str, detail: impl ToString) -> HubError {
    HubError::Decode {
        url: url.to_string(),
        detail: detail.to_string(),
    }
}

/// Descriptors from one page of `/orgs/{org}/repos`.
///
/// A repository without a default branch has never been pushed to; it is
/// left out with a warning rather than guessed at.
pub fn parse_repo_page(url: &str, body: &str) -> Result<Vec<RepoDescriptor>, HubError> {
    let raw: Vec<GhRepo> = serde_json::from_str(body).map_err(|e| decode_err(url, e))?;
    let mut repos = Vec::with_capacity(raw.len());
    for r in raw {
        let created_at = OffsetDateTime::parse(&r.created_at, &Rfc3339)
            .map_err(|e| decode_err(url, format!("{}: created_at: {e}", r.name)))?;
        let Some(default_branch) = r.default_branch.filter(|b| !b.trim().is_empty()) else {
            tracing::warn!(repo = %r.name, reason = "no default branch", "skipped");
            continue;
        };
        repos.push(RepoDescriptor {
            name: r.name,
            clone_url: r.clone_url,
            default_branch,
            created_at,
        });
    }
    Ok(repos)
}

/// `(attributable, total)` commits on one page of `/repos/{org}/{repo}/commits`.
///
/// A commit is excluded when either its GitHub login or its git author name
/// is in `excluded_authors`.
pub fn count_attributable(
    url: &str,
    body: &str,
    excluded_authors: &[String],
) -> Result<(u64, usize), HubError> {
    let commits: Vec<GhCommit> = serde_json::from_str(body).map_err(|e| decode_err(url, e))?;
    let excluded = |name: &str| excluded_authors.iter().any(|a| a == name);
    let counted = commits
        .iter()
        .filter(|c| {
            let by_login = c.author.as_ref().is_some_and(|u| excluded(&u.login));
            let by_name = c
                .commit
                .author
                .as_ref()
                .and_then(|s| s.name.as_deref())
                .is_some_and(excluded);
            !(by_login || by_name)
        })
        .count();
    Ok((counted as u64, commits.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn repo_page_maps_fields() {
        let body = r#"[
          {"name":"hw1-jdoe","clone_url":"https://github.com/org/hw1-jdoe.git",
           "default_branch":"main","created_at":"2024-01-05T10:00:00Z","private":true},
          {"name":"hw1-old","clone_url":"https://github.com/org/hw1-old.git",
           "default_branch":null,"created_at":"2023-09-01T00:00:00Z"}
        ]"#;
        let repos = parse_repo_page("u", body).unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name, "hw1-jdoe");
        assert_eq!(repos[0].default_branch, "main");
        assert_eq!(repos[0].created_at, datetime!(2024-01-05 10:00 UTC));
    }

    #[test]
    fn default_branch_comes_from_listing() {
        let body = r#"[
          {"name":"hw1-a","clone_url":"c","default_branch":"trunk","created_at":"2024-01-05T10:00:00Z"},
          {"name":"hw1-b","clone_url":"c","default_branch":"","created_at":"2024-01-05T10:00:00Z"},
          {"name":"hw1-c","clone_url":"c","created_at":"2024-01-05T10:00:00Z"}
        ]"#;
        let repos = parse_repo_page("u", body).unwrap();
        let branches: Vec<_> = repos
            .iter()
            .map(|r| (r.name.as_str(), r.default_branch.as_str()))
            .collect();
        assert_eq!(branches, [("hw1-a", "trunk")]);
    }

    #[test]
    fn bad_timestamp_is_decode_error() {
        let body = r#"[{"name":"x","clone_url":"c","default_branch":"main","created_at":"yesterday"}]"#;
        assert!(matches!(
            parse_repo_page("u", body),
            Err(HubError::Decode { .. })
        ));
    }

    #[test]
    fn bot_commits_are_not_attributable() {
        let body = r#"[
          {"author":{"login":"jdoe"},"commit":{"author":{"name":"Jane Doe"}}},
          {"author":{"login":"github-classroom[bot]"},"commit":{"author":{"name":"github-classroom[bot]"}}},
          {"author":null,"commit":{"author":{"name":"github-classroom[bot]"}}},
          {"author":null,"commit":{"author":null}}
        ]"#;
        let excluded = vec!["github-classroom[bot]".to_string()];
        assert_eq!(count_attributable("u", body, &excluded).unwrap(), (2, 4));
        assert_eq!(count_attributable("u", body, &[]).unwrap(), (4, 4));
    }

    #[test]
    fn new_trims_api_base() {
        let host = GitHubHost::new("https://api.github.com/", "org", "t".into()).unwrap();
        assert_eq!(host.api_base, "https://api.github.com");
    }
}
