//! Repository domain types and repository-level API operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{encode_query_value, Error, GitHubClient, Permissions, User};

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;

/// Represents a GitHub repository.
///
/// Only the fields the administrative operations read are modelled. Everything
/// is defaulted so that the same type can be read from the repository, the
/// organization listing, the team listing and the installation listing
/// endpoints, which each return slightly different shapes.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Repository {
    /// Numeric repository ID
    #[serde(default)]
    pub id: u64,
    /// Repository name without the owner
    pub name: String,
    /// `owner/name`
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub archived: bool,
    /// `public`, `private` or `internal`
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    /// Size in kilobytes as reported by GitHub
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub clone_url: Option<String>,
    #[serde(default)]
    pub owner: Option<User>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
    /// Permissions of the caller, or of the team when listed through a team
    #[serde(default)]
    pub permissions: Option<Permissions>,
}

impl Repository {
    /// Returns the visibility, deriving it from `private` when GitHub omitted it.
    pub fn visibility(&self) -> &str {
        match self.visibility.as_deref() {
            Some(v) => v,
            None if self.private => "private",
            None => "public",
        }
    }

    /// Returns the owner login, falling back to the `full_name` prefix.
    pub fn owner_login(&self) -> Option<&str> {
        self.owner
            .as_ref()
            .map(|o| o.login.as_str())
            .or_else(|| self.full_name.split_once('/').map(|(owner, _)| owner))
    }
}

/// Fields that can be changed on an existing repository.
///
/// Use `Default::default()` and set the fields to change.
#[derive(Serialize, Default, Debug, Clone)]
pub struct RepositoryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
}

/// Represents the payload for creating a new repository via the REST API.
#[derive(Serialize, Default, Debug, Clone)]
pub struct RepositoryCreatePayload {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_init: Option<bool>,
}

/// A branch as returned by the branch listing endpoint.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Branch {
    pub name: String,
    pub commit: CommitRef,
    #[serde(default)]
    pub protected: bool,
}

/// A pointer to a commit.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CommitRef {
    pub sha: String,
}

/// A commit as returned by the commit listing endpoint.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CommitSummary {
    pub sha: String,
    pub commit: CommitDetail,
    /// The GitHub account linked to the author email, when there is one
    #[serde(default)]
    pub author: Option<User>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub author: Option<GitActor>,
    #[serde(default)]
    pub committer: Option<GitActor>,
    #[serde(default)]
    pub message: String,
}

/// Name, email and date recorded in a git commit.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GitActor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl CommitSummary {
    /// Email recorded as the commit author.
    pub fn author_email(&self) -> Option<&str> {
        self.commit.author.as_ref().and_then(|a| a.email.as_deref())
    }

    /// Login of the GitHub account the commit is attributed to.
    pub fn author_login(&self) -> Option<&str> {
        self.author.as_ref().map(|a| a.login.as_str())
    }

    /// Commit date, preferring the committer date.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.commit
            .committer
            .as_ref()
            .and_then(|c| c.date)
            .or_else(|| self.commit.author.as_ref().and_then(|a| a.date))
    }
}

impl GitHubClient {
    /// Fetches details for a specific repository.
    ///
    /// # Errors
    /// Returns `Error::NotFound` when the repository does not exist or is not
    /// visible to the caller.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    pub async fn get_repository(&self, owner: &str, repo: &str) -> Result<Repository, Error> {
        self.get_json(&format!("/repos/{owner}/{repo}")).await
    }

    /// Lists every repository of an organization, archived ones included.
    #[instrument(skip(self))]
    pub async fn list_org_repositories(&self, org: &str) -> Result<Vec<Repository>, Error> {
        let repos: Vec<Repository> = self
            .paginate(&format!("/orgs/{org}/repos?type=all"))
            .await?;
        info!(org = org, count = repos.len(), "Listed organization repositories");
        Ok(repos)
    }

    /// Updates settings for a repository. Only the fields set in `update` change.
    #[instrument(skip(self, update), fields(owner = %owner, repo = %repo))]
    pub async fn update_repository(
        &self,
        owner: &str,
        repo: &str,
        update: &RepositoryUpdate,
    ) -> Result<Repository, Error> {
        self.patch_json(&format!("/repos/{owner}/{repo}"), update)
            .await
    }

    /// Creates a new repository within an organization.
    #[instrument(skip(self, payload), fields(repo = %payload.name))]
    pub async fn create_org_repository(
        &self,
        org: &str,
        payload: &RepositoryCreatePayload,
    ) -> Result<Repository, Error> {
        self.post_json(&format!("/orgs/{org}/repos"), payload).await
    }

    /// Deletes a repository. Returns `false` when it did not exist.
    ///
    /// Needs the `delete_repo` scope.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    pub async fn delete_repository(&self, owner: &str, repo: &str) -> Result<bool, Error> {
        self.delete(&format!("/repos/{owner}/{repo}")).await
    }

    /// Lists every branch of a repository.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    pub async fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<Branch>, Error> {
        self.paginate(&format!("/repos/{owner}/{repo}/branches"))
            .await
    }

    /// Returns the newest commit reachable from `branch`, or `None` for an
    /// empty repository.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    pub async fn latest_commit(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Option<CommitSummary>, Error> {
        let path = format!(
            "/repos/{owner}/{repo}/commits?sha={}&per_page=1",
            encode_query_value(branch)
        );
        self.first_commit(&path).await
    }

    /// Returns the newest commit on `branch` dated at or before `until`.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    pub async fn latest_commit_until(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        until: DateTime<Utc>,
    ) -> Result<Option<CommitSummary>, Error> {
        let path = format!(
            "/repos/{owner}/{repo}/commits?sha={}&until={}&per_page=1",
            encode_query_value(branch),
            encode_query_value(&until.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        );
        self.first_commit(&path).await
    }

    async fn first_commit(&self, path: &str) -> Result<Option<CommitSummary>, Error> {
        // An empty repository answers 409 "Git Repository is empty."
        match self.get_json::<Vec<CommitSummary>>(path).await {
            Ok(commits) => Ok(commits.into_iter().next()),
            Err(Error::NotFound) | Err(Error::Api { status: 409, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
