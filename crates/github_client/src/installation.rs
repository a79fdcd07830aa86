//! GitHub App installation domain types and operations.
//!
//! Listing installations requires a client authenticated with the App JWT
//! ([`crate::create_app_client`]). Listing the repositories of an installation
//! requires an installation client ([`GitHubClient::installation_client`]).

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::{Error, GitHubClient, Repository};

#[cfg(test)]
#[path = "installation_tests.rs"]
mod tests;

/// Represents a GitHub account (user or organization).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Account {
    /// The unique ID of the account
    #[serde(default)]
    pub id: u64,
    /// The login name of the account
    pub login: String,
    /// The type of account (User or Organization)
    #[serde(rename = "type", default)]
    pub account_type: String,
}

/// Represents a GitHub App installation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Installation {
    /// The unique ID of the installation
    pub id: u64,
    /// The account (user or organization) where the app is installed
    pub account: Account,
    /// `all` or `selected`
    #[serde(default)]
    pub repository_selection: Option<String>,
    /// Slug of the app the installation belongs to
    #[serde(default)]
    pub app_slug: Option<String>,
}

/// Body of `GET /rate_limit`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimit {
    pub resources: RateLimitResources,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitResources {
    pub core: RateLimitResource,
}

/// Usage of a single rate limit bucket.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct RateLimitResource {
    pub limit: u64,
    pub used: u64,
    pub remaining: u64,
    /// Epoch second at which the window resets
    pub reset: u64,
}

impl GitHubClient {
    /// Lists all installations of the authenticated GitHub App.
    #[instrument(skip(self))]
    pub async fn list_installations(&self) -> Result<Vec<Installation>, Error> {
        info!("Listing installations for GitHub App using JWT authentication");
        let installations: Vec<Installation> = self
            .paginate("/app/installations")
            .await
            .inspect_err(|_| {
                error!("Failed to list installations - this likely means JWT authentication failed")
            })?;

        info!(
            count = installations.len(),
            "Successfully retrieved installations for GitHub App"
        );
        Ok(installations)
    }

    /// Lists the repositories visible to the installation this client is
    /// authenticated as.
    #[instrument(skip(self))]
    pub async fn list_installation_repositories(&self) -> Result<Vec<Repository>, Error> {
        self.paginate_wrapped("/installation/repositories", "repositories")
            .await
    }

    /// Adds a repository to an installation with `selected` repository access.
    ///
    /// Requires a user token with admin rights on the installation account.
    #[instrument(skip(self))]
    pub async fn add_repository_to_installation(
        &self,
        installation_id: u64,
        repository_id: u64,
    ) -> Result<(), Error> {
        let path = format!("/user/installations/{installation_id}/repositories/{repository_id}");
        self.put(&path, &serde_json::json!({})).await?;
        info!(
            installation_id = installation_id,
            repository_id = repository_id,
            "Added repository to installation"
        );
        Ok(())
    }

    /// Reads the rate limit status of the current credentials.
    #[instrument(skip(self))]
    pub async fn rate_limit(&self) -> Result<RateLimit, Error> {
        self.get_json("/rate_limit").await
    }
}
