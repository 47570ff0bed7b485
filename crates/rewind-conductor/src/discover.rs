//! Turning a discovery listing (or an existing folder) into the job list.

use crate::task::RepoJob;
use crate::FleetError;
use rewind_hub::RepoHost;
use rewind_roster::{check_collisions, Roster};
use std::path::Path;

/// Jobs for every repository whose name contains `assignment`.
///
/// With a roster, repositories that match no member are left out and the rest
/// are named `<assignment>-<member name>`; without one the repository name is
/// used as is.
pub async fn plan_clone_jobs(
    host: &dyn RepoHost,
    assignment: &str,
    roster: Option<&Roster>,
) -> Result<Vec<RepoJob>, FleetError> {
    let repos = host.list_repos(assignment).await?;
    let mut jobs = Vec::with_capacity(repos.len());
    for descriptor in repos {
        let display_name = match roster {
            Some(r) => match r.display_name(&descriptor.name, assignment) {
                Some(name) => name,
                None => {
                    tracing::debug!(repo = %descriptor.name, "not on roster, ignored");
                    continue;
                }
            },
            None => descriptor.name.clone(),
        };
        jobs.push(RepoJob::Clone {
            descriptor,
            display_name,
        });
    }
    check_unique(&jobs)?;
    Ok(jobs)
}

/// Jobs for the checkouts already under `assignment_dir`, one per subdirectory.
pub fn plan_existing_jobs(assignment_dir: &Path) -> Result<Vec<RepoJob>, FleetError> {
    let jobs = rewind_store::list_repo_dirs(assignment_dir)?
        .into_iter()
        .filter_map(|dir| {
            let name = dir.file_name()?.to_string_lossy().into_owned();
            Some(RepoJob::Existing {
                display_name: name,
                dir,
            })
        })
        .collect();
    Ok(jobs)
}

/// Two jobs may never share a folder or results key.
pub fn check_unique(jobs: &[RepoJob]) -> Result<(), FleetError> {
    check_collisions(jobs.iter().map(|j| (j.repo_name(), j.display_name())))?;
    Ok(())
}
