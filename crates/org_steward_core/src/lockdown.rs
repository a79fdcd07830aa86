//! Repository lockdown: make private, archive and strip every form of access.
//!
//! Each listed repository goes through the same steps in order:
//!
//! 1. fetch its metadata (a missing repository counts as an error, not as processed);
//! 2. make it private unless it already is;
//! 3. archive it unless it already is;
//! 4. remove every direct collaborator;
//! 5. remove every team mapping;
//! 6. revoke every pending invitation.
//!
//! Failures for one repository are recorded and the run moves on, unless the
//! failure means the credentials are unusable.

use std::collections::HashSet;

use github_client::{Disposition, GitHubClient, Repository, RepositoryUpdate};
use tracing::{error, info, instrument, warn};

use crate::errors::{Error, Result};

#[cfg(test)]
#[path = "lockdown_tests.rs"]
mod tests;

/// Counters reported at the end of a lockdown run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LockdownSummary {
    pub processed: usize,
    pub made_private: usize,
    pub archived: usize,
    pub collaborators_removed: usize,
    pub teams_removed: usize,
    pub invitations_revoked: usize,
    pub errors: usize,
}

/// Counters reported at the end of an unarchive run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnarchiveSummary {
    pub unarchived: usize,
    pub already_active: usize,
    pub errors: usize,
}

/// Records a per-repository failure, or returns it when the run must stop.
fn record_failure(errors: &mut usize, repo: &str, step: &str, e: Error) -> Result<()> {
    if e.disposition() == Disposition::Abort {
        error!(repo = repo, step = step, error = %e, "Stopping run");
        return Err(e);
    }
    error!(repo = repo, step = step, error = %e, "Step failed");
    *errors += 1;
    Ok(())
}

fn is_policy_rejection(e: &github_client::Error) -> bool {
    matches!(e.status(), Some(403) | Some(422))
}

/// Locks down every repository in `repos`, owned by `org`.
///
/// With `dry_run` set the intended mutations are logged and nothing changes.
#[instrument(skip(client, repos), fields(count = repos.len()))]
pub async fn lockdown_repositories(
    client: &GitHubClient,
    org: &str,
    repos: &[String],
    dry_run: bool,
) -> Result<LockdownSummary> {
    let mut summary = LockdownSummary::default();
    for repo in repos {
        info!(repo = %repo, dry_run = dry_run, "Locking down repository");
        let metadata = match client.get_repository(org, repo).await {
            Ok(m) => m,
            Err(e) => {
                record_failure(&mut summary.errors, repo, "fetch metadata", e.into())?;
                continue;
            }
        };
        summary.processed += 1;
        if let Err(e) =
            lockdown_repository(client, org, repo, metadata, dry_run, &mut summary).await
        {
            record_failure(&mut summary.errors, repo, "lockdown", e)?;
        }
    }
    info!(
        processed = summary.processed,
        made_private = summary.made_private,
        archived = summary.archived,
        collaborators_removed = summary.collaborators_removed,
        teams_removed = summary.teams_removed,
        invitations_revoked = summary.invitations_revoked,
        errors = summary.errors,
        "Lockdown finished"
    );
    Ok(summary)
}

async fn lockdown_repository(
    client: &GitHubClient,
    org: &str,
    repo: &str,
    metadata: Repository,
    dry_run: bool,
    summary: &mut LockdownSummary,
) -> Result<()> {
    // Internal repositories also report `private: true`.
    if metadata.visibility() == "private" {
        info!(repo = repo, "Already private");
    } else if dry_run {
        info!(repo = repo, visibility = metadata.visibility(), "Would make repository private");
    } else {
        let update = RepositoryUpdate {
            private: Some(true),
            visibility: Some("private".to_string()),
            ..Default::default()
        };
        match client.update_repository(org, repo, &update).await {
            Ok(_) => {
                info!(repo = repo, "Made repository private");
                summary.made_private += 1;
            }
            // Organization policy can forbid visibility changes; archiving still applies.
            Err(e) if is_policy_rejection(&e) => {
                warn!(repo = repo, error = %e, "Could not make repository private");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let metadata = if dry_run {
        metadata
    } else {
        client.get_repository(org, repo).await?
    };
    if metadata.archived {
        info!(repo = repo, "Already archived");
    } else if dry_run {
        info!(repo = repo, "Would archive repository");
    } else {
        let update = RepositoryUpdate {
            archived: Some(true),
            ..Default::default()
        };
        client.update_repository(org, repo, &update).await?;
        info!(repo = repo, "Archived repository");
        summary.archived += 1;
    }

    remove_collaborators(client, org, repo, dry_run, summary).await?;
    remove_teams(client, org, repo, dry_run, summary).await?;
    revoke_invitations(client, org, repo, dry_run, summary).await?;
    Ok(())
}

async fn remove_collaborators(
    client: &GitHubClient,
    org: &str,
    repo: &str,
    dry_run: bool,
    summary: &mut LockdownSummary,
) -> Result<()> {
    let collaborators = client.list_collaborators(org, repo).await?;
    let mut seen = HashSet::new();
    for collaborator in collaborators {
        if !seen.insert(collaborator.login.to_ascii_lowercase()) {
            continue;
        }
        let login = collaborator.login.as_str();
        let role = collaborator.role();
        if dry_run {
            info!(repo = repo, user = login, permission = %role, "Would remove collaborator");
            continue;
        }
        match client.remove_collaborator(org, repo, login).await {
            Ok(_) => {
                info!(repo = repo, user = login, permission = %role, "Removed collaborator");
                summary.collaborators_removed += 1;
            }
            Err(e) => record_failure(&mut summary.errors, repo, "remove collaborator", e.into())?,
        }
    }
    Ok(())
}

async fn remove_teams(
    client: &GitHubClient,
    org: &str,
    repo: &str,
    dry_run: bool,
    summary: &mut LockdownSummary,
) -> Result<()> {
    let teams = client.list_repository_teams(org, repo).await?;
    for team in teams {
        if dry_run {
            info!(repo = repo, team = %team.slug, "Would remove team");
            continue;
        }
        match client
            .remove_team_repository(org, &team.slug, org, repo)
            .await
        {
            Ok(_) => {
                info!(repo = repo, team = %team.slug, "Removed team");
                summary.teams_removed += 1;
            }
            Err(e) => record_failure(&mut summary.errors, repo, "remove team", e.into())?,
        }
    }
    Ok(())
}

async fn revoke_invitations(
    client: &GitHubClient,
    org: &str,
    repo: &str,
    dry_run: bool,
    summary: &mut LockdownSummary,
) -> Result<()> {
    let invitations = client.list_invitations(org, repo).await?;
    for invitation in invitations {
        let invitee = invitation
            .invitee
            .as_ref()
            .map(|u| u.login.clone())
            .unwrap_or_default();
        if dry_run {
            info!(repo = repo, invitee = %invitee, "Would revoke invitation");
            continue;
        }
        match client.delete_invitation(org, repo, invitation.id).await {
            Ok(_) => {
                info!(repo = repo, invitee = %invitee, "Revoked invitation");
                summary.invitations_revoked += 1;
            }
            Err(e) => record_failure(&mut summary.errors, repo, "revoke invitation", e.into())?,
        }
    }
    Ok(())
}

/// Sets `archived=false` on every listed repository that is archived.
#[instrument(skip(client, repos), fields(count = repos.len()))]
pub async fn unarchive_repositories(
    client: &GitHubClient,
    org: &str,
    repos: &[String],
    dry_run: bool,
) -> Result<UnarchiveSummary> {
    let mut summary = UnarchiveSummary::default();
    for repo in repos {
        let outcome = async {
            let metadata = client.get_repository(org, repo).await?;
            if !metadata.archived {
                info!(repo = %repo, "Repository is not archived");
                summary.already_active += 1;
                return Ok(());
            }
            if dry_run {
                info!(repo = %repo, "Would unarchive repository");
                return Ok(());
            }
            let update = RepositoryUpdate {
                archived: Some(false),
                ..Default::default()
            };
            client.update_repository(org, repo, &update).await?;
            info!(repo = %repo, "Unarchived repository");
            summary.unarchived += 1;
            Ok::<(), Error>(())
        }
        .await;
        if let Err(e) = outcome {
            record_failure(&mut summary.errors, repo, "unarchive", e)?;
        }
    }
    Ok(summary)
}
