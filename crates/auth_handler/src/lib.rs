//! Authentication handler for org-steward.
//!
//! Credentials are never compiled into the tools. They come from the
//! environment or the system keyring and are held as [`SecretString`] so that
//! they are redacted from `Debug` output and logs.
//!
//! ## Architecture
//!
//! - [`GitHubCredentials`] turns a token or App key into a [`GitHubClient`].
//! - [`InstallationAuthenticator`] is the seam operations depend on when they
//!   need to act as a GitHub App installation.
//! - [`GitHubAuthService`] implements it for a single registered App.
//! - [`load_app_registrations`] reads every App configured through numbered
//!   environment variables.

use async_trait::async_trait;
use github_client::{GitHubClient, Installation};
use secrecy::SecretString;

mod app_registry;
mod credentials;
mod github_auth_service;

pub use app_registry::{
    load_app_registrations, load_app_registrations_from_env, AppRegistration, APP_ID_VAR_PREFIX,
    APP_KEY_PATH_VAR_PREFIX, APP_KEY_VAR_PREFIX, MAX_APP_REGISTRATIONS,
};
pub use credentials::{GitHubCredentials, TOKEN_ENV_VAR};
pub use github_auth_service::GitHubAuthService;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Result type for authentication operations
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Errors that can occur during authentication operations
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials provided")]
    InvalidCredentials,

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("GitHub API error: {0}")]
    GitHubError(String),

    #[error("Authentication error: {0}")]
    Other(String),
}

impl From<github_client::Error> for AuthError {
    fn from(e: github_client::Error) -> Self {
        match e {
            github_client::Error::AuthError(_) => AuthError::InvalidCredentials,
            other => AuthError::GitHubError(other.to_string()),
        }
    }
}

/// Acting as the installations of a GitHub App.
///
/// Operations that report on or sample installations depend on this trait
/// rather than on a concrete service so they can be exercised against mocks.
#[async_trait]
pub trait InstallationAuthenticator: Send + Sync {
    /// A short human readable name for the App, used in reports.
    fn label(&self) -> &str;

    /// Lists every installation of the App.
    async fn installations(&self) -> AuthResult<Vec<Installation>>;

    /// Lists the installations of the App on `org` (case-insensitive).
    async fn installations_for_org(&self, org: &str) -> AuthResult<Vec<Installation>> {
        Ok(self
            .installations()
            .await?
            .into_iter()
            .filter(|i| i.account.login.eq_ignore_ascii_case(org))
            .collect())
    }

    /// Creates a client authenticated as one installation, plus its token.
    async fn installation_client(
        &self,
        installation_id: u64,
    ) -> AuthResult<(GitHubClient, SecretString)>;
}
