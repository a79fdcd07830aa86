//! Inactive repository and member detection.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use github_client::{Disposition, GitHubClient};
use tracing::{debug, error, info, instrument, warn};

use crate::errors::Result;
use crate::report::{format_timestamp, Table};

#[cfg(test)]
#[path = "inactivity_tests.rs"]
mod tests;

pub const REPOSITORY_COLUMN: &str = "Repository";
pub const LAST_COMMIT_EMAIL_COLUMN: &str = "Last Commit Email";
pub const LAST_COMMIT_USERNAME_COLUMN: &str = "Last Commit Username";
pub const LAST_PUSHED_COLUMN: &str = "Repo Last Pushed (pushed_at)";

pub const NO_PUBLIC_ACTIVITY: &str = "No public activity";

/// Audit log searches tried in order when looking for a user's last login.
pub const LOGIN_ACTIONS: [&str; 3] = [
    "user.login",
    "user.failed_login",
    "github_app_authentication",
];

/// Returns `true` when no branch head was committed at or after `cutoff`.
/// Heads without a commit date are ignored.
pub fn all_heads_older_than(
    heads: &[github_client::BranchHead],
    cutoff: DateTime<Utc>,
) -> bool {
    heads
        .iter()
        .filter_map(|h| h.committed_date)
        .all(|date| date < cutoff)
}

/// Finds non-archived repositories whose every branch is older than `cutoff`.
///
/// Branch heads are checked `workers` repositories at a time. The repositories
/// found are then looked up one by one for the last commit on the default
/// branch and the last push time.
#[instrument(skip(client))]
pub async fn find_inactive_repositories(
    client: &GitHubClient,
    org: &str,
    cutoff: DateTime<Utc>,
    workers: usize,
) -> Result<Table> {
    let repos: Vec<String> = client
        .list_org_repository_nodes(org)
        .await?
        .into_iter()
        .filter(|r| !r.is_archived)
        .map(|r| r.name)
        .collect();
    info!(count = repos.len(), "Checking non-archived repositories");

    let checks: Vec<_> = stream::iter(repos)
        .map(|repo| async move {
            let heads = client.branch_heads(org, &repo).await;
            (repo, heads)
        })
        .buffer_unordered(workers.max(1))
        .collect()
        .await;

    let mut inactive = Vec::new();
    for (repo, heads) in checks {
        match heads {
            Ok(heads) if all_heads_older_than(&heads, cutoff) => {
                debug!(repo = %repo, "Inactive");
                inactive.push(repo);
            }
            Ok(_) => debug!(repo = %repo, "Active"),
            Err(e) if e.disposition() == Disposition::Abort => return Err(e.into()),
            Err(e) => error!(repo = %repo, error = %e, "Failed to read branch heads"),
        }
    }
    inactive.sort_by_key(|r| r.to_ascii_lowercase());
    info!(count = inactive.len(), "Inactive repositories found");

    let mut table = Table::new([
        REPOSITORY_COLUMN,
        LAST_COMMIT_EMAIL_COLUMN,
        LAST_COMMIT_USERNAME_COLUMN,
        LAST_PUSHED_COLUMN,
    ]);
    for repo in inactive {
        let (email, login, pushed) = match last_commit_details(client, org, &repo).await {
            Ok(details) => details,
            Err(e) if e.disposition() == Disposition::Abort => return Err(e.into()),
            Err(e) => {
                warn!(repo = %repo, error = %e, "Failed to read last commit");
                Default::default()
            }
        };
        table.push_row([repo, email, login, pushed]);
    }
    Ok(table)
}

async fn last_commit_details(
    client: &GitHubClient,
    org: &str,
    repo: &str,
) -> std::result::Result<(String, String, String), github_client::Error> {
    let metadata = client.get_repository(org, repo).await?;
    let pushed = format_timestamp(metadata.pushed_at);
    let Some(branch) = metadata.default_branch.as_deref() else {
        return Ok((String::new(), String::new(), pushed));
    };
    let commit = client.latest_commit(org, repo, branch).await?;
    let email = commit
        .as_ref()
        .and_then(|c| c.author_email())
        .unwrap_or_default()
        .to_string();
    let login = commit
        .as_ref()
        .and_then(|c| c.author_login())
        .unwrap_or_default()
        .to_string();
    Ok((email, login, pushed))
}

/// Lists members whose latest public event is older than `cutoff`, or who
/// have none.
#[instrument(skip(client))]
pub async fn find_inactive_members(
    client: &GitHubClient,
    org: &str,
    cutoff: DateTime<Utc>,
) -> Result<Table> {
    let members = client.list_org_members(org).await?;
    let mut table = Table::new(["username", "last_activity"]);

    for member in members {
        match client.latest_public_event(&member.login).await {
            Ok(Some(event)) if event.created_at < cutoff => {
                table.push_row([member.login, format_timestamp(Some(event.created_at))]);
            }
            Ok(Some(_)) => {}
            Ok(None) => table.push_row([member.login, NO_PUBLIC_ACTIVITY.to_string()]),
            Err(e) if e.disposition() == Disposition::Abort => return Err(e.into()),
            Err(e) => error!(user = %member.login, error = %e, "Failed to read public events"),
        }
    }
    info!(inactive = table.len(), "Inactive member check finished");
    Ok(table)
}

/// The most recent login-like audit log event of a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LastLogin {
    pub at: DateTime<Utc>,
    /// The audit log phrase that matched
    pub phrase: String,
}

/// Searches the organization audit log for the user's latest login.
///
/// Requires an organization owner token. Returns `None` when no event falls
/// within the audit log retention window.
#[instrument(skip(client))]
pub async fn last_login(client: &GitHubClient, org: &str, user: &str) -> Result<Option<LastLogin>> {
    for action in LOGIN_ACTIONS {
        let phrase = format!("actor:{user} action:{action}");
        let Some(entry) = client.search_audit_log(org, &phrase).await? else {
            continue;
        };
        if let Some(at) = entry.timestamp() {
            info!(user = user, at = %at, phrase = %phrase, "Found login event");
            return Ok(Some(LastLogin { at, phrase }));
        }
    }
    info!(user = user, "No login events found");
    Ok(None)
}
