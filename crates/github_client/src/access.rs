//! Access control types and operations: collaborators, teams and invitations.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{Error, GitHubClient, Repository, User};

#[cfg(test)]
#[path = "access_tests.rs"]
mod tests;

/// Permission flags as GitHub reports them on collaborators and team repositories.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Permissions {
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub maintain: bool,
    #[serde(default)]
    pub push: bool,
    #[serde(default)]
    pub triage: bool,
    #[serde(default)]
    pub pull: bool,
}

impl Permissions {
    /// Returns the name of the highest permission set, or `none`.
    pub fn highest(&self) -> &'static str {
        if self.admin {
            "admin"
        } else if self.maintain {
            "maintain"
        } else if self.push {
            "push"
        } else if self.triage {
            "triage"
        } else if self.pull {
            "pull"
        } else {
            "none"
        }
    }
}

/// Ranks a permission name so that permissions can be compared.
///
/// GitHub uses both the REST names (`pull`, `push`) and the UI names (`read`,
/// `write`); both are accepted. Unknown names rank lowest.
pub fn permission_rank(permission: &str) -> u8 {
    match permission.to_ascii_lowercase().as_str() {
        "admin" => 5,
        "maintain" => 4,
        "push" | "write" => 3,
        "triage" => 2,
        "pull" | "read" => 1,
        _ => 0,
    }
}

/// A repository collaborator.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Collaborator {
    pub login: String,
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub permissions: Option<Permissions>,
    #[serde(default)]
    pub role_name: Option<String>,
}

impl Collaborator {
    /// The collaborator's role, preferring GitHub's `role_name`.
    pub fn role(&self) -> String {
        self.role_name
            .clone()
            .or_else(|| self.permissions.map(|p| p.highest().to_string()))
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// A team, either listed for an organization or for a repository.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Team {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    pub slug: String,
    /// Team permission on the repository, when listed through a repository
    #[serde(default)]
    pub permission: Option<String>,
}

/// A pending repository invitation.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Invitation {
    pub id: u64,
    #[serde(default)]
    pub invitee: Option<User>,
    #[serde(default)]
    pub permissions: Option<String>,
}

#[derive(Deserialize)]
struct PermissionResponse {
    permission: String,
}

#[derive(Serialize)]
struct TeamRepositoryPermission<'a> {
    permission: &'a str,
}

impl GitHubClient {
    /// Lists the collaborators of a repository, including org members with access.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    pub async fn list_collaborators(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<Collaborator>, Error> {
        self.paginate(&format!("/repos/{owner}/{repo}/collaborators?affiliation=all"))
            .await
    }

    /// Returns the effective permission of `user` on a repository.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo, user = %user))]
    pub async fn collaborator_permission(
        &self,
        owner: &str,
        repo: &str,
        user: &str,
    ) -> Result<String, Error> {
        let response: PermissionResponse = self
            .get_json(&format!(
                "/repos/{owner}/{repo}/collaborators/{user}/permission"
            ))
            .await?;
        Ok(response.permission)
    }

    /// Removes a collaborator. Returns `false` when the user was not a collaborator.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo, user = %user))]
    pub async fn remove_collaborator(
        &self,
        owner: &str,
        repo: &str,
        user: &str,
    ) -> Result<bool, Error> {
        self.delete(&format!("/repos/{owner}/{repo}/collaborators/{user}"))
            .await
    }

    /// Lists the teams with access to a repository.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    pub async fn list_repository_teams(&self, owner: &str, repo: &str) -> Result<Vec<Team>, Error> {
        self.paginate(&format!("/repos/{owner}/{repo}/teams")).await
    }

    /// Lists every team of an organization.
    #[instrument(skip(self))]
    pub async fn list_org_teams(&self, org: &str) -> Result<Vec<Team>, Error> {
        self.paginate(&format!("/orgs/{org}/teams")).await
    }

    /// Lists the repositories a team has access to, with the team's permissions.
    #[instrument(skip(self))]
    pub async fn list_team_repositories(
        &self,
        org: &str,
        team_slug: &str,
    ) -> Result<Vec<Repository>, Error> {
        self.paginate(&format!("/orgs/{org}/teams/{team_slug}/repos"))
            .await
    }

    /// Grants a team access to a repository with the given permission.
    ///
    /// GitHub answers 204 for both new and updated grants.
    #[instrument(skip(self))]
    pub async fn add_team_repository(
        &self,
        org: &str,
        team_slug: &str,
        owner: &str,
        repo: &str,
        permission: &str,
    ) -> Result<(), Error> {
        let path = format!("/orgs/{org}/teams/{team_slug}/repos/{owner}/{repo}");
        self.put(&path, &TeamRepositoryPermission { permission })
            .await?;
        info!(
            team = team_slug,
            repo = repo,
            permission = permission,
            "Granted team access"
        );
        Ok(())
    }

    /// Removes a team's access to a repository. Returns `false` when the team
    /// had no access.
    #[instrument(skip(self))]
    pub async fn remove_team_repository(
        &self,
        org: &str,
        team_slug: &str,
        owner: &str,
        repo: &str,
    ) -> Result<bool, Error> {
        self.delete(&format!(
            "/orgs/{org}/teams/{team_slug}/repos/{owner}/{repo}"
        ))
        .await
    }

    /// Lists the pending invitations of a repository.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    pub async fn list_invitations(&self, owner: &str, repo: &str) -> Result<Vec<Invitation>, Error> {
        self.paginate(&format!("/repos/{owner}/{repo}/invitations"))
            .await
    }

    /// Revokes a pending invitation. Returns `false` when it no longer existed.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    pub async fn delete_invitation(
        &self,
        owner: &str,
        repo: &str,
        invitation_id: u64,
    ) -> Result<bool, Error> {
        self.delete(&format!(
            "/repos/{owner}/{repo}/invitations/{invitation_id}"
        ))
        .await
    }
}
