//! Repository access audits and bulk team grants.

use futures::stream::{self, StreamExt};
use github_client::access::permission_rank;
use github_client::{Disposition, GitHubClient};
use tracing::{error, info, instrument, warn};

use crate::errors::{Error, Result};
use crate::report::{Table, Workbook};

#[cfg(test)]
#[path = "access_tests.rs"]
mod tests;

pub const NO_ACCESS_COLUMN: &str = "Repo With No Access";

/// Outcome of granting a team access to one repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrantResult {
    pub repo: String,
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GrantSummary {
    pub ok: usize,
    pub total: usize,
    /// Sorted by repository name, ignoring case
    pub results: Vec<GrantResult>,
}

impl GrantSummary {
    pub fn to_table(&self) -> Table {
        let mut table = Table::new(["Repository", "Result", "Message"]);
        for r in &self.results {
            table.push_row([
                r.repo.clone(),
                if r.ok { "OK" } else { "FAILED" }.to_string(),
                r.message.clone(),
            ]);
        }
        table
    }
}

/// Lists the repositories that have neither collaborators nor teams.
///
/// Repositories that cannot be read are logged and left out of the report.
#[instrument(skip(client, repos), fields(count = repos.len()))]
pub async fn audit_no_access(client: &GitHubClient, org: &str, repos: &[String]) -> Result<Table> {
    let mut table = Table::new([NO_ACCESS_COLUMN]);
    for repo in repos {
        match has_any_access(client, org, repo).await {
            Ok(true) => {}
            Ok(false) => {
                info!(repo = %repo, "Repository has no access entries");
                table.push_row([repo.clone()]);
            }
            Err(e) if e.disposition() == Disposition::Abort => return Err(e.into()),
            Err(e) => error!(repo = %repo, error = %e, "Failed to check access"),
        }
    }
    info!(no_access = table.len(), "Access audit finished");
    Ok(table)
}

async fn has_any_access(
    client: &GitHubClient,
    org: &str,
    repo: &str,
) -> std::result::Result<bool, github_client::Error> {
    if !client.list_collaborators(org, repo).await?.is_empty() {
        return Ok(true);
    }
    Ok(!client.list_repository_teams(org, repo).await?.is_empty())
}

/// Grants `team_slug` the given permission on every repository, `workers` at a time.
///
/// # Errors
/// Per-repository failures are reported in the summary. The call itself only
/// fails when a failure means the credentials are unusable.
#[instrument(skip(client, repos), fields(count = repos.len()))]
pub async fn grant_team_access(
    client: &GitHubClient,
    org: &str,
    team_slug: &str,
    repos: &[String],
    permission: &str,
    workers: usize,
    dry_run: bool,
) -> Result<GrantSummary> {
    if permission_rank(permission) == 0 {
        return Err(Error::InvalidInput(format!(
            "unknown permission '{permission}'"
        )));
    }

    let outcomes: Vec<(String, std::result::Result<(), github_client::Error>)> =
        stream::iter(repos.iter().cloned())
            .map(|repo| async move {
                if dry_run {
                    info!(repo = %repo, team = team_slug, "Would grant team access");
                    return (repo, Ok(()));
                }
                let result = client
                    .add_team_repository(org, team_slug, org, &repo, permission)
                    .await;
                (repo, result)
            })
            .buffer_unordered(workers.max(1))
            .collect()
            .await;

    let mut summary = GrantSummary {
        total: outcomes.len(),
        ..Default::default()
    };
    for (repo, outcome) in outcomes {
        match outcome {
            Ok(()) => {
                summary.ok += 1;
                let message = if dry_run { "dry run" } else { "granted" };
                summary.results.push(GrantResult {
                    repo,
                    ok: true,
                    message: message.to_string(),
                });
            }
            Err(e) if e.disposition() == Disposition::Abort => return Err(e.into()),
            Err(e) => {
                warn!(repo = %repo, error = %e, "Failed to grant team access");
                summary.results.push(GrantResult {
                    repo,
                    ok: false,
                    message: e.to_string(),
                });
            }
        }
    }
    summary
        .results
        .sort_by_key(|r| r.repo.to_ascii_lowercase());

    info!(ok = summary.ok, total = summary.total, "Team grants finished");
    Ok(summary)
}

/// Summarises every team of the organization.
///
/// The `Teams` sheet has one row per team with its repository count and the
/// highest permission it holds anywhere; `Team_Repositories` lists each
/// team/repository pair.
#[instrument(skip(client))]
pub async fn team_acl_report(client: &GitHubClient, org: &str, workers: usize) -> Result<Workbook> {
    let mut teams = client.list_org_teams(org).await?;
    teams.sort_by_key(|t| t.slug.to_ascii_lowercase());

    let listings: Vec<_> = stream::iter(teams.iter())
        .map(|team| async move { (team, client.list_team_repositories(org, &team.slug).await) })
        .buffered(workers.max(1))
        .collect()
        .await;

    let mut summary = Table::new(["Team", "Slug", "Repository Count", "Highest Permission"]);
    let mut detail = Table::new(["Team", "Repository", "Permission"]);
    for (team, listing) in listings {
        let repos = match listing {
            Ok(repos) => repos,
            Err(e) if e.disposition() == Disposition::Abort => return Err(e.into()),
            Err(e) => {
                error!(team = %team.slug, error = %e, "Failed to list team repositories");
                continue;
            }
        };

        let mut highest = "none";
        for repo in &repos {
            let permission = repo.permissions.map(|p| p.highest()).unwrap_or("none");
            if permission_rank(permission) > permission_rank(highest) {
                highest = permission;
            }
            detail.push_row([team.name.clone(), repo.name.clone(), permission.to_string()]);
        }
        summary.push_row([
            team.name.clone(),
            team.slug.clone(),
            repos.len().to_string(),
            highest.to_string(),
        ]);
    }

    let mut workbook = Workbook::new();
    workbook.add_sheet("Teams", summary);
    workbook.add_sheet("Team_Repositories", detail);
    Ok(workbook)
}

/// Lists the direct collaborators of each repository with their permission.
#[instrument(skip(client, repos), fields(count = repos.len()))]
pub async fn collaborator_report(
    client: &GitHubClient,
    org: &str,
    repos: &[String],
) -> Result<Table> {
    let mut table = Table::new(["Repository", "Login", "Permission"]);
    for repo in repos {
        match client.list_collaborators(org, repo).await {
            Ok(collaborators) => {
                for c in collaborators {
                    table.push_row([repo.clone(), c.login.clone(), c.role()]);
                }
            }
            Err(e) if e.disposition() == Disposition::Abort => return Err(e.into()),
            Err(e) => error!(repo = %repo, error = %e, "Failed to list collaborators"),
        }
    }
    Ok(table)
}
