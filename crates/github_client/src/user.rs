//! User domain types and organization membership operations.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{Error, GitHubClient};

#[cfg(test)]
#[path = "user_tests.rs"]
mod tests;

/// Represents a GitHub user account as embedded in other payloads.
///
/// # Examples
///
/// ```rust
/// use github_client::User;
///
/// let user = User {
///     id: 12345,
///     login: "octocat".to_string(),
/// };
///
/// println!("User: {} (ID: {})", user.login, user.id);
/// ```
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct User {
    /// The unique numeric ID of the user
    #[serde(default)]
    pub id: u64,
    /// The login name of the user
    pub login: String,
}

/// Full profile of a user as returned by `GET /users/{login}`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct UserProfile {
    pub login: String,
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    /// Public email; `None` when the user hides it
    #[serde(default)]
    pub email: Option<String>,
}

impl UserProfile {
    /// Splits the display name into first name and the remainder.
    pub fn split_name(&self) -> (String, String) {
        let name = self.name.as_deref().unwrap_or_default().trim();
        match name.split_once(char::is_whitespace) {
            Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
            None => (name.to_string(), String::new()),
        }
    }
}

impl GitHubClient {
    /// Lists the members of an organization.
    #[instrument(skip(self))]
    pub async fn list_org_members(&self, org: &str) -> Result<Vec<User>, Error> {
        self.paginate(&format!("/orgs/{org}/members")).await
    }

    /// Reads a user's public profile.
    #[instrument(skip(self))]
    pub async fn get_user(&self, login: &str) -> Result<UserProfile, Error> {
        self.get_json(&format!("/users/{login}")).await
    }
}
