//! Organization repository inventories: archived and active listings, branch
//! listings and size estimates.

use std::cmp::Ordering;

use futures::stream::{self, StreamExt};
use github_client::{Disposition, GitHubClient, Repository};
use tracing::{info, instrument, warn};

use crate::errors::Result;
use crate::report::{format_timestamp, Table};

#[cfg(test)]
#[path = "inventory_tests.rs"]
mod tests;

/// A clone with full history is estimated at this multiple of the default
/// branch size reported by GitHub.
pub const FULL_HISTORY_MULTIPLIER: u64 = 3;

pub const DEFAULT_SPLIT_THRESHOLD_MB: f64 = 200.0;

pub const ESTIMATED_FULL_SIZE_KB_COLUMN: &str = "estimated_full_size_kb";

/// Lists archived repositories, most recently updated first.
#[instrument(skip(client))]
pub async fn archived_repository_report(client: &GitHubClient, org: &str) -> Result<Table> {
    let repos = client.list_org_repositories(org).await?;
    let total = repos.len();
    let mut archived: Vec<Repository> = repos.into_iter().filter(|r| r.archived).collect();
    info!(total = total, archived = archived.len(), "Filtered archived repositories");

    archived.sort_by(|a, b| match b.updated_at.cmp(&a.updated_at) {
        Ordering::Equal => a.full_name.cmp(&b.full_name),
        other => other,
    });

    let mut table = Table::new([
        "name",
        "full_name",
        "visibility",
        "private",
        "default_branch",
        "created_at",
        "updated_at",
        "pushed_at",
        "size_kb",
        "html_url",
        "description",
    ]);
    for repo in &archived {
        table.push_row([
            repo.name.clone(),
            repo.full_name.clone(),
            repo.visibility().to_string(),
            repo.private.to_string(),
            repo.default_branch.clone().unwrap_or_default(),
            format_timestamp(repo.created_at),
            format_timestamp(repo.updated_at),
            format_timestamp(repo.pushed_at),
            repo.size.to_string(),
            repo.html_url.clone().unwrap_or_default(),
            repo.description.clone().unwrap_or_default(),
        ]);
    }
    Ok(table)
}

/// Lists non-archived repositories with their visibility.
#[instrument(skip(client))]
pub async fn active_repository_report(client: &GitHubClient, org: &str) -> Result<Table> {
    let mut table = Table::new(["Repository Name", "Visibility"]);
    for repo in client
        .list_org_repositories(org)
        .await?
        .into_iter()
        .filter(|r| !r.archived)
    {
        let visibility = repo.visibility().to_string();
        table.push_row([repo.name, visibility]);
    }
    info!(count = table.len(), "Listed active repositories");
    Ok(table)
}

/// Lists every branch of every repository.
///
/// The repository name is only written on its first row. Repositories whose
/// branches cannot be read contribute no rows.
#[instrument(skip(client))]
pub async fn branch_report(client: &GitHubClient, org: &str, workers: usize) -> Result<Table> {
    let repos = client.list_org_repositories(org).await?;

    let listings: Vec<_> = stream::iter(repos)
        .map(|repo| async move {
            let branches = client.list_branches(org, &repo.name).await;
            (repo, branches)
        })
        .buffered(workers.max(1))
        .collect()
        .await;

    let mut table = Table::new(["Repo Name", "Branch Name", "Is Default Branch"]);
    for (repo, branches) in listings {
        let branches = match branches {
            Ok(b) => b,
            Err(e) if e.disposition() == Disposition::Abort => return Err(e.into()),
            Err(e) => {
                warn!(repo = %repo.name, error = %e, "Failed to list branches");
                continue;
            }
        };
        let default_branch = repo.default_branch.as_deref().unwrap_or_default();
        for (i, branch) in branches.iter().enumerate() {
            let name = if i == 0 { repo.name.as_str() } else { "" };
            let marker = if branch.name == default_branch { "default" } else { "" };
            table.push_row([name, branch.name.as_str(), marker]);
        }
    }
    Ok(table)
}

/// Size estimate for one repository.
#[derive(Clone, Debug, PartialEq)]
pub struct SizeEstimate {
    pub name: String,
    pub default_branch_size_kb: u64,
    pub estimated_full_size_kb: u64,
}

impl SizeEstimate {
    pub fn from_repository(repo: &Repository) -> Self {
        Self {
            name: repo.name.clone(),
            default_branch_size_kb: repo.size,
            estimated_full_size_kb: repo.size * FULL_HISTORY_MULTIPLIER,
        }
    }

    pub fn estimated_full_size_mb(&self) -> f64 {
        round2(self.estimated_full_size_kb as f64 / 1024.0)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Estimates the full-history size of every repository in the organization.
#[instrument(skip(client))]
pub async fn size_estimates(client: &GitHubClient, org: &str) -> Result<Vec<SizeEstimate>> {
    let estimates: Vec<SizeEstimate> = client
        .list_org_repositories(org)
        .await?
        .iter()
        .map(SizeEstimate::from_repository)
        .collect();
    info!(count = estimates.len(), "Estimated repository sizes");
    Ok(estimates)
}

pub fn size_table(estimates: &[SizeEstimate]) -> Table {
    let mut table = Table::new([
        "name",
        "default_branch_size_kb",
        ESTIMATED_FULL_SIZE_KB_COLUMN,
        "estimated_full_size_mb",
    ]);
    for e in estimates {
        table.push_row([
            e.name.clone(),
            e.default_branch_size_kb.to_string(),
            e.estimated_full_size_kb.to_string(),
            e.estimated_full_size_mb().to_string(),
        ]);
    }
    table
}

/// Repositories split around a size threshold.
#[derive(Clone, Debug)]
pub struct SizeSplit {
    pub all: Table,
    /// Strictly below the threshold
    pub small: Table,
    pub large: Table,
}

/// Splits `repos` by their reported size in megabytes.
pub fn split_by_size(repos: &[Repository], threshold_mb: f64) -> SizeSplit {
    let headers = ["Name", "Full Name", "Private", "Size (MB)", "URL"];
    let mut split = SizeSplit {
        all: Table::new(headers),
        small: Table::new(headers),
        large: Table::new(headers),
    };

    for repo in repos {
        let size_mb = round2(repo.size as f64 / 1024.0);
        let row = [
            repo.name.clone(),
            repo.full_name.clone(),
            repo.private.to_string(),
            size_mb.to_string(),
            repo.html_url.clone().unwrap_or_default(),
        ];
        split.all.push_row(row.clone());
        if size_mb < threshold_mb {
            split.small.push_row(row);
        } else {
            split.large.push_row(row);
        }
    }
    info!(
        small = split.small.len(),
        large = split.large.len(),
        threshold_mb = threshold_mb,
        "Split repositories by size"
    );
    split
}
