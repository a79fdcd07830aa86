//! GitHub App authentication service implementation.
//!
//! Provides the concrete [`InstallationAuthenticator`] for one registered App.

use crate::{AppRegistration, AuthError, AuthResult, InstallationAuthenticator};
use async_trait::async_trait;
use github_client::{create_app_client, GitHubClient, Installation, RetryPolicy};
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info, instrument};

#[cfg(test)]
#[path = "github_auth_service_tests.rs"]
mod tests;

/// GitHub App authentication service
///
/// # Examples
///
/// ```rust,no_run
/// use auth_handler::{GitHubAuthService, InstallationAuthenticator};
/// use secrecy::SecretString;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let private_key = std::fs::read_to_string("app-key.pem")?;
/// let auth_service = GitHubAuthService::new(12345, SecretString::from(private_key));
///
/// for installation in auth_service.installations_for_org("my-org").await? {
///     let (client, _token) = auth_service.installation_client(installation.id).await?;
///     println!("{} repositories", client.list_installation_repositories().await?.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct GitHubAuthService {
    app_id: u64,
    private_key: SecretString,
    label: String,
    base_uri: Option<String>,
    retry: RetryPolicy,
}

impl GitHubAuthService {
    /// Create a new GitHub App authentication service
    pub fn new(app_id: u64, private_key: SecretString) -> Self {
        Self {
            app_id,
            private_key,
            label: format!("App{app_id}"),
            base_uri: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Creates a service from an environment registration.
    pub fn from_registration(registration: &AppRegistration) -> Self {
        Self::new(registration.app_id, registration.private_key.clone())
            .with_label(registration.label())
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Targets a GitHub Enterprise Server API root (or a test server).
    pub fn with_base_uri(mut self, base_uri: Option<String>) -> Self {
        self.base_uri = base_uri;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn app_id(&self) -> u64 {
        self.app_id
    }

    /// Builds a client authenticated with the App JWT.
    #[instrument(skip(self), fields(app_id = self.app_id))]
    pub async fn app_client(&self) -> AuthResult<GitHubClient> {
        let octocrab = create_app_client(
            self.app_id,
            self.private_key.expose_secret(),
            self.base_uri.as_deref(),
        )
        .await
        .map_err(|e| {
            error!(app_id = self.app_id, error = %e, "Failed to create GitHub App client");
            AuthError::InvalidCredentials
        })?;

        Ok(GitHubClient::new(octocrab).with_retry_policy(self.retry.clone()))
    }
}

#[async_trait]
impl InstallationAuthenticator for GitHubAuthService {
    fn label(&self) -> &str {
        &self.label
    }

    async fn installations(&self) -> AuthResult<Vec<Installation>> {
        let client = self.app_client().await?;
        let installations = client.list_installations().await.map_err(|e| {
            AuthError::GitHubError(format!(
                "Failed to list installations for app {}: {e}",
                self.app_id
            ))
        })?;

        info!(
            app_id = self.app_id,
            count = installations.len(),
            "Listed App installations"
        );
        Ok(installations)
    }

    async fn installation_client(
        &self,
        installation_id: u64,
    ) -> AuthResult<(GitHubClient, SecretString)> {
        let client = self.app_client().await?;
        client
            .installation_client(installation_id)
            .await
            .map_err(|e| {
                AuthError::GitHubError(format!(
                    "Failed to get installation token for installation {installation_id}: {e}"
                ))
            })
    }
}

impl std::fmt::Debug for GitHubAuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubAuthService")
            .field("app_id", &self.app_id)
            .field("label", &self.label)
            .field("private_key", &"<REDACTED>")
            .finish()
    }
}
