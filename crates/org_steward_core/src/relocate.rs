//! Repository surgery: moving a folder between repositories and rebuilding a
//! repository as it stood on a given date.

use std::path::Path;

use chrono::{NaiveDate, TimeZone, Utc};
use git2::{Oid, Repository};
use github_client::{Disposition, GitHubClient, RepositoryCreatePayload, RepositoryUpdate};
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::errors::{Error, Result};
use crate::git;

#[cfg(test)]
#[path = "relocate_tests.rs"]
mod tests;

/// Result of [`move_folder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Path of the folder inside the destination repository
    pub destination: String,
    pub branch: String,
    /// `None` when the destination already held identical content
    pub commit: Option<String>,
    pub files: u64,
}

fn repository_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut s| s.next_back())
        .map(|last| last.trim_end_matches(".git").to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| url.to_string())
}

/// Copies `folder` of the source repository to `<dest_subdir>/<folder name>`
/// of the destination repository, then commits and pushes the destination's
/// default branch.
///
/// Both repositories are cloned under `workdir`. The destination folder must
/// not exist yet.
#[instrument(skip(token, workdir), fields(source = %source, dest = %dest))]
pub fn move_folder(
    source: &Url,
    dest: &Url,
    folder: &str,
    dest_subdir: &str,
    token: Option<&SecretString>,
    workdir: &Path,
) -> Result<MoveOutcome> {
    let folder = folder.trim_matches('/');
    let folder_name = folder
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::InvalidInput("folder to move must not be empty".to_string()))?;
    let dest_subdir = dest_subdir.trim_matches('/');
    let destination = if dest_subdir.is_empty() {
        folder_name.to_string()
    } else {
        format!("{dest_subdir}/{folder_name}")
    };

    let source_name = repository_name(source);
    let source_dir = workdir.join(format!("source-{source_name}"));
    let dest_dir = workdir.join(format!("dest-{}", repository_name(dest)));
    for dir in [&source_dir, &dest_dir] {
        if dir.exists() {
            git::remove_dir_best_effort(dir);
        }
    }

    git::clone_repository(source, &source_dir, token)?;
    let dest_repo = git::clone_repository(dest, &dest_dir, token)?;

    let target = dest_dir.join(&destination);
    if target.exists() {
        return Err(Error::InvalidInput(format!(
            "'{destination}' already exists in the destination repository"
        )));
    }
    let files = git::copy_tree(&source_dir.join(folder), &target)?;
    info!(files = files, destination = %destination, "Copied folder");

    let branch = git::head_branch(&dest_repo)?;
    let commit = git::commit_path(
        &dest_repo,
        &destination,
        &format!("Moved {folder_name} from {source_name}"),
    )?;
    if commit.is_some() {
        git::push(
            &dest_repo,
            dest,
            &[format!("refs/heads/{branch}:refs/heads/{branch}")],
            token,
        )?;
    } else {
        warn!("Copied folder produced no changes, nothing pushed");
    }

    Ok(MoveOutcome {
        destination,
        branch,
        commit: commit.map(|c| c.to_string()),
        files,
    })
}

fn owned_token(token: Option<&SecretString>) -> Option<SecretString> {
    token.map(|t| SecretString::from(t.expose_secret().to_string()))
}

async fn run_blocking<T, F>(task: &str, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::GitOperation(format!("{task} task failed: {e}")))?
}

/// Mirror-clones `source` into `dir` and points every branch in `branches` at
/// its snapshot commit.
fn prepare_snapshot(
    source: &Url,
    dir: &Path,
    branches: &[(String, String)],
    token: Option<&SecretString>,
) -> Result<Repository> {
    if dir.exists() {
        git::remove_dir_best_effort(dir);
    }
    let mirror = git::mirror_clone(source, dir, token)?;
    for (branch, sha) in branches {
        let oid = Oid::from_str(sha)
            .map_err(|e| Error::GitOperation(format!("invalid commit id {sha}: {e}")))?;
        git::set_branch(&mirror, branch, oid)?;
    }
    Ok(mirror)
}

/// Deletes a snapshot repository whose push failed, so the run can be
/// repeated. Returns the error to report.
async fn discard_empty_repository(
    client: &GitHubClient,
    org: &str,
    repo: &str,
    push_error: Error,
) -> Error {
    error!(repo = repo, error = %push_error, "Push failed, deleting the empty snapshot repository");
    match client.delete_repository(org, repo).await {
        Ok(_) => push_error,
        Err(e) => {
            error!(repo = repo, error = %e, "Failed to delete the empty snapshot repository");
            Error::GitOperation(format!(
                "{push_error}; {org}/{repo} was created but is empty and could not be deleted ({e}), delete it before retrying"
            ))
        }
    }
}

/// Result of [`snapshot_at`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapshotOutcome {
    /// `(branch, commit sha)` pairs pushed to the new repository
    pub branches: Vec<(String, String)>,
    /// Branches without a commit at or before the cutoff
    pub skipped: Vec<String>,
    pub default_branch: Option<String>,
}

/// Where [`snapshot_at`] clones from and pushes to.
#[derive(Debug)]
pub struct SnapshotTarget<'a> {
    pub web_base: &'a Url,
    pub token: Option<&'a SecretString>,
    pub workdir: &'a Path,
}

/// Creates `new_repo` as a private copy of `old_repo` with every branch reset
/// to its newest commit made on or before `cutoff` (end of day, UTC).
///
/// Branches with no commit that old are left out. The new repository gets
/// the old default branch when that branch was copied. When the push fails
/// the new repository is deleted again.
#[instrument(skip(client, target))]
pub async fn snapshot_at(
    client: &GitHubClient,
    org: &str,
    old_repo: &str,
    new_repo: &str,
    cutoff: NaiveDate,
    target: &SnapshotTarget<'_>,
) -> Result<SnapshotOutcome> {
    let until = cutoff
        .and_hms_opt(23, 59, 59)
        .map(|end_of_day| Utc.from_utc_datetime(&end_of_day))
        .ok_or_else(|| Error::InvalidInput(format!("invalid cutoff date {cutoff}")))?;
    let old = client.get_repository(org, old_repo).await?;
    let branches = client.list_branches(org, old_repo).await?;

    let mut outcome = SnapshotOutcome::default();
    for branch in branches {
        match client
            .latest_commit_until(org, old_repo, &branch.name, until)
            .await
        {
            Ok(Some(commit)) => {
                info!(branch = %branch.name, sha = %commit.sha, "Snapshot commit found");
                outcome.branches.push((branch.name, commit.sha));
            }
            Ok(None) => {
                warn!(branch = %branch.name, "No commit on or before cutoff, skipping branch");
                outcome.skipped.push(branch.name);
            }
            Err(e) if e.disposition() == Disposition::Abort => return Err(e.into()),
            Err(e) => {
                error!(branch = %branch.name, error = %e, "Failed to read branch history, skipping");
                outcome.skipped.push(branch.name);
            }
        }
    }
    if outcome.branches.is_empty() {
        return Err(Error::InvalidInput(format!(
            "{old_repo} has no commits on or before {cutoff}"
        )));
    }

    let source_url = git::repository_url(target.web_base, org, old_repo)?;
    let dest_url = git::repository_url(target.web_base, org, new_repo)?;
    let mirror_dir = target.workdir.join(format!("{old_repo}.snapshot"));

    // Clone and reset before creating anything, so a failed clone leaves no
    // repository behind.
    let prepared = {
        let (mirror_dir, branches) = (mirror_dir.clone(), outcome.branches.clone());
        let token = owned_token(target.token);
        run_blocking("clone", move || {
            prepare_snapshot(&source_url, &mirror_dir, &branches, token.as_ref())
        })
        .await
    };
    let mirror = match prepared {
        Ok(mirror) => mirror,
        Err(e) => {
            if mirror_dir.exists() {
                git::remove_dir_best_effort(&mirror_dir);
            }
            return Err(e);
        }
    };

    let payload = RepositoryCreatePayload {
        name: new_repo.to_string(),
        private: Some(true),
        description: Some(format!("Snapshot of {old_repo} as of {cutoff}")),
        ..Default::default()
    };
    client.create_org_repository(org, &payload).await?;
    info!(repo = new_repo, "Created snapshot repository");

    let refspecs: Vec<String> = outcome
        .branches
        .iter()
        .map(|(branch, _)| format!("+refs/heads/{branch}:refs/heads/{branch}"))
        .collect();
    let token = owned_token(target.token);
    let pushed = run_blocking("push", move || {
        git::push(&mirror, &dest_url, &refspecs, token.as_ref())
    })
    .await;
    git::remove_dir_best_effort(&mirror_dir);
    if let Err(e) = pushed {
        return Err(discard_empty_repository(client, org, new_repo, e).await);
    }

    if let Some(default_branch) = old.default_branch.filter(|d| {
        outcome.branches.iter().any(|(b, _)| b == d)
    }) {
        let update = RepositoryUpdate {
            default_branch: Some(default_branch.clone()),
            ..Default::default()
        };
        client.update_repository(org, new_repo, &update).await?;
        info!(repo = new_repo, branch = %default_branch, "Default branch set");
        outcome.default_branch = Some(default_branch);
    }

    info!(
        pushed = outcome.branches.len(),
        skipped = outcome.skipped.len(),
        "Snapshot complete"
    );
    Ok(outcome)
}
