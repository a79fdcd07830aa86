//! Local Git repository operations.
//!
//! Clones, commits and pushes go through git2. HTTPS authentication uses the
//! `x-access-token` user name with a token supplied through the credential
//! callback, so tokens never appear in remote URLs or in `.git/config`.

use std::fs;
use std::path::Path;

use git2::{
    AutotagOption, Cred, CredentialType, FetchOptions, IndexAddOption, Oid, PushOptions,
    RemoteCallbacks, Repository, Signature,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, info, warn};
use url::Url;
use walkdir::WalkDir;

use crate::errors::{Error, Result};

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;

pub const MIRROR_REFSPEC: &str = "+refs/*:refs/*";

const COMMITTER_NAME: &str = "org-steward";
const COMMITTER_EMAIL: &str = "org-steward@users.noreply.github.com";

fn git_error(context: &str, e: git2::Error) -> Error {
    error!(class = ?e.class(), code = ?e.code(), "{context}: {}", e.message());
    let hint = match e.class() {
        git2::ErrorClass::Net => " (network error, check connectivity and the URL)",
        git2::ErrorClass::Http => " (HTTP error, check token permissions)",
        git2::ErrorClass::Callback => " (credentials rejected, the token may be invalid or expired)",
        _ => "",
    };
    Error::GitOperation(format!("{context}: {}{hint}", e.message()))
}

/// Returns the HTTPS clone URL of `owner/repo` on the given web host.
pub fn repository_url(web_base: &Url, owner: &str, repo: &str) -> Result<Url> {
    web_base
        .join(&format!("{owner}/{repo}.git"))
        .map_err(|e| Error::InvalidInput(format!("cannot build clone URL for {owner}/{repo}: {e}")))
}

/// Builds callbacks answering HTTPS credential challenges with `token`.
///
/// Without a token, challenges are refused and only anonymous or local
/// transports work.
fn remote_callbacks(token: Option<&SecretString>) -> RemoteCallbacks<'static> {
    let mut callbacks = RemoteCallbacks::new();
    let token = token.map(|t| t.expose_secret().to_string());

    callbacks.credentials(move |url, _username, allowed_types| {
        debug!(url = url, allowed = ?allowed_types, "Git credential callback");
        match &token {
            Some(token) if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) => {
                Cred::userpass_plaintext("x-access-token", token)
            }
            Some(_) => Err(git2::Error::from_str(
                "No supported credential types for GitHub authentication",
            )),
            None => Err(git2::Error::from_str("No token configured for git access")),
        }
    });
    callbacks.push_update_reference(|refname, status| match status {
        Some(msg) => {
            error!(reference = refname, "Reference update rejected: {msg}");
            Err(git2::Error::from_str(&format!(
                "Push reference update failed for {refname}: {msg}"
            )))
        }
        None => {
            debug!(reference = refname, "Reference updated");
            Ok(())
        }
    });
    callbacks
}

fn fetch_options(token: Option<&SecretString>) -> FetchOptions<'static> {
    let mut options = FetchOptions::new();
    options.remote_callbacks(remote_callbacks(token));
    options.download_tags(AutotagOption::All);
    options
}

/// Creates a bare mirror of `url` in `dest`, equivalent to `git clone --mirror`.
pub fn mirror_clone(url: &Url, dest: &Path, token: Option<&SecretString>) -> Result<Repository> {
    info!(url = %url, dest = %dest.display(), "Mirror cloning");
    let repo = Repository::init_bare(dest)
        .map_err(|e| git_error("Failed to initialize bare repository", e))?;

    {
        let mut remote = repo
            .remote_with_fetch("origin", url.as_str(), MIRROR_REFSPEC)
            .map_err(|e| git_error("Failed to add origin", e))?;
        repo.config()
            .and_then(|mut c| c.set_bool("remote.origin.mirror", true))
            .map_err(|e| git_error("Failed to mark origin as mirror", e))?;
        remote
            .fetch(&[MIRROR_REFSPEC], Some(&mut fetch_options(token)), None)
            .map_err(|e| git_error("Failed to fetch mirror", e))?;
    }

    info!(dest = %dest.display(), "Mirror clone complete");
    Ok(repo)
}

/// Clones `url` with a working tree checked out at its default branch.
pub fn clone_repository(url: &Url, dest: &Path, token: Option<&SecretString>) -> Result<Repository> {
    info!(url = %url, dest = %dest.display(), "Cloning");
    git2::build::RepoBuilder::new()
        .fetch_options(fetch_options(token))
        .clone(url.as_str(), dest)
        .map_err(|e| git_error("Failed to clone repository", e))
}

/// Returns the local branch HEAD points to.
pub fn head_branch(repo: &Repository) -> Result<String> {
    let head = repo
        .head()
        .map_err(|e| git_error("Repository has no HEAD", e))?;
    head.shorthand()
        .filter(|_| head.is_branch())
        .map(str::to_string)
        .ok_or_else(|| Error::GitOperation("HEAD is not on a branch".to_string()))
}

fn signature(repo: &Repository) -> Result<Signature<'static>> {
    match repo.signature() {
        Ok(sig) => Ok(sig),
        Err(_) => Signature::now(COMMITTER_NAME, COMMITTER_EMAIL)
            .map_err(|e| git_error("Failed to create signature", e)),
    }
}

/// Stages everything under `pathspec` (relative to the work tree) and commits
/// it on top of HEAD.
///
/// Returns `None` when the staged tree equals HEAD's tree.
pub fn commit_path(repo: &Repository, pathspec: &str, message: &str) -> Result<Option<Oid>> {
    let mut index = repo
        .index()
        .map_err(|e| git_error("Failed to get repository index", e))?;
    index
        .add_all([pathspec].iter(), IndexAddOption::DEFAULT, None)
        .map_err(|e| git_error("Failed to add files to index", e))?;
    index
        .write()
        .map_err(|e| git_error("Failed to write index", e))?;
    let tree_oid = index
        .write_tree()
        .map_err(|e| git_error("Failed to write tree", e))?;
    let tree = repo
        .find_tree(tree_oid)
        .map_err(|e| git_error("Failed to find tree", e))?;

    let parent = match repo.head() {
        Ok(head) => Some(
            head.peel_to_commit()
                .map_err(|e| git_error("Failed to resolve HEAD commit", e))?,
        ),
        Err(_) => None,
    };
    if parent.as_ref().is_some_and(|p| p.tree_id() == tree_oid) {
        info!(pathspec = pathspec, "Nothing to commit");
        return Ok(None);
    }

    let sig = signature(repo)?;
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    let oid = repo
        .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .map_err(|e| git_error("Failed to create commit", e))?;
    info!(commit = %oid, message = message, "Committed");
    Ok(Some(oid))
}

/// Pushes `refspecs` to `url`.
pub fn push(
    repo: &Repository,
    url: &Url,
    refspecs: &[String],
    token: Option<&SecretString>,
) -> Result<()> {
    info!(url = %url, refspecs = ?refspecs, "Pushing");
    let mut remote = repo
        .remote_anonymous(url.as_str())
        .map_err(|e| git_error("Failed to create remote", e))?;
    let mut options = PushOptions::new();
    options.remote_callbacks(remote_callbacks(token));

    let specs: Vec<&str> = refspecs.iter().map(String::as_str).collect();
    remote
        .push(&specs, Some(&mut options))
        .map_err(|e| git_error("Git push failed", e))?;
    info!(url = %url, "Push complete");
    Ok(())
}

/// Points `refs/heads/<branch>` at `oid`, creating or moving it.
pub fn set_branch(repo: &Repository, branch: &str, oid: Oid) -> Result<()> {
    repo.reference(
        &format!("refs/heads/{branch}"),
        oid,
        true,
        &format!("snapshot {branch}"),
    )
    .map_err(|e| git_error("Failed to update branch", e))?;
    Ok(())
}

/// Copies the directory tree `src` into `dest`, creating `dest` as needed.
///
/// The `.git` directory of `src` is never copied.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<u64> {
    if !src.is_dir() {
        return Err(Error::InvalidInput(format!(
            "'{}' is not a directory",
            src.display()
        )));
    }
    let mut copied = 0;
    for entry in WalkDir::new(src)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
    {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::InvalidInput(e.to_string()))?;
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    debug!(files = copied, src = %src.display(), dest = %dest.display(), "Copied directory");
    Ok(copied)
}

/// Removes a directory tree, logging instead of failing.
pub fn remove_dir_best_effort(path: &Path) {
    if let Err(e) = fs::remove_dir_all(path) {
        warn!(path = %path.display(), error = %e, "Failed to remove directory");
    }
}
