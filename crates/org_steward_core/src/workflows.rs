//! GitHub Actions usage audit.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use github_client::{Disposition, GitHubClient};
use tracing::{debug, error, info, instrument};

use crate::errors::Result;
use crate::report::{Table, Workbook};

#[cfg(test)]
#[path = "workflows_tests.rs"]
mod tests;

pub const REPOS_SHEET: &str = "Repos_Using_Actions";
pub const ACTIVE_SHEET: &str = "Active_Workflows";
pub const INACTIVE_SHEET: &str = "Inactive_Workflows";

const WORKFLOW_DIR: &str = ".github/workflows";

/// Workflows of one repository split by recent activity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RepositoryWorkflows {
    pub repository: String,
    pub active: Vec<String>,
    pub inactive: Vec<String>,
}

/// Classifies the workflows of `repo`.
///
/// Returns `None` when the repository has no workflow directory. A workflow
/// is active when its latest run was updated at or after `cutoff`; workflows
/// that never ran are inactive and workflows whose runs cannot be read are
/// left out.
pub async fn repository_workflows(
    client: &GitHubClient,
    org: &str,
    repo: &str,
    cutoff: DateTime<Utc>,
) -> Result<Option<RepositoryWorkflows>> {
    if client.list_directory(org, repo, WORKFLOW_DIR).await?.is_none() {
        debug!(repo = repo, "No workflow directory");
        return Ok(None);
    }

    let mut result = RepositoryWorkflows {
        repository: repo.to_string(),
        ..Default::default()
    };
    for workflow in client.list_workflows(org, repo).await? {
        match client.latest_workflow_run(org, repo, workflow.id).await {
            Ok(Some(run)) if run.updated_at.is_some_and(|t| t >= cutoff) => {
                result.active.push(workflow.name)
            }
            Ok(_) => result.inactive.push(workflow.name),
            Err(e) if e.disposition() == Disposition::Abort => return Err(e.into()),
            Err(e) => {
                error!(repo = repo, workflow = %workflow.name, error = %e, "Failed to read workflow runs");
            }
        }
    }
    Ok(Some(result))
}

/// Audits Actions usage across the non-archived repositories of `org`.
///
/// Produces the sheets [`REPOS_SHEET`], [`ACTIVE_SHEET`] and
/// [`INACTIVE_SHEET`]. Repositories that fail to load are skipped.
#[instrument(skip(client))]
pub async fn workflow_audit(
    client: &GitHubClient,
    org: &str,
    cutoff: DateTime<Utc>,
    workers: usize,
) -> Result<Workbook> {
    let repos: Vec<String> = client
        .list_org_repository_nodes(org)
        .await?
        .into_iter()
        .filter(|n| !n.is_archived)
        .map(|n| n.name)
        .collect();
    info!(repos = repos.len(), "Checking repositories for workflows");

    let results: Vec<_> = stream::iter(repos)
        .map(|repo| async move {
            let result = repository_workflows(client, org, &repo, cutoff).await;
            (repo, result)
        })
        .buffered(workers.max(1))
        .collect()
        .await;

    let mut using = Table::new(["repository"]);
    let mut active = Table::new(["repository", "workflow"]);
    let mut inactive = Table::new(["repository", "workflow"]);
    for (repo, result) in results {
        let found = match result {
            Ok(Some(found)) => found,
            Ok(None) => continue,
            Err(e) if e.disposition() == Disposition::Abort => return Err(e),
            Err(e) => {
                error!(repo = %repo, error = %e, "Skipping repository");
                continue;
            }
        };
        using.push_row([found.repository.as_str()]);
        for name in &found.active {
            active.push_row([found.repository.as_str(), name.as_str()]);
        }
        for name in &found.inactive {
            inactive.push_row([found.repository.as_str(), name.as_str()]);
        }
    }
    info!(
        repos = using.len(),
        active = active.len(),
        inactive = inactive.len(),
        "Workflow audit complete"
    );

    let mut workbook = Workbook::new();
    workbook.add_sheet(REPOS_SHEET, using);
    workbook.add_sheet(ACTIVE_SHEET, active);
    workbook.add_sheet(INACTIVE_SHEET, inactive);
    Ok(workbook)
}
