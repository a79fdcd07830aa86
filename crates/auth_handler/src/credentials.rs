//! GitHub credentials and client construction.

use github_client::{create_app_client, create_token_client, GitHubClient, RetryPolicy};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};

use crate::{AuthError, AuthResult};

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod tests;

/// Environment variable holding a personal access token.
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Credentials used to talk to GitHub.
///
/// The derived `Debug` is safe: `SecretString` prints as `[REDACTED]`.
#[derive(Clone, Debug)]
pub enum GitHubCredentials {
    /// A personal access token (classic or fine-grained).
    Token(SecretString),

    /// A GitHub App ID and its PEM encoded private key.
    App {
        app_id: u64,
        private_key: SecretString,
    },
}

impl GitHubCredentials {
    /// Builds token credentials, rejecting blank tokens.
    pub fn token(token: impl Into<String>) -> AuthResult<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(AuthError::MissingCredentials(
                "the GitHub token is empty".to_string(),
            ));
        }
        Ok(GitHubCredentials::Token(SecretString::from(token.trim().to_string())))
    }

    /// Builds a client for these credentials.
    ///
    /// `base_uri` targets GitHub Enterprise Server; `None` targets api.github.com.
    #[instrument(skip(self, retry))]
    pub async fn connect(
        &self,
        base_uri: Option<&str>,
        retry: RetryPolicy,
        page_size: u32,
    ) -> AuthResult<GitHubClient> {
        let octocrab = match self {
            GitHubCredentials::Token(token) => {
                debug!("Creating GitHub client from personal access token");
                create_token_client(token.expose_secret(), base_uri)?
            }
            GitHubCredentials::App {
                app_id,
                private_key,
            } => {
                debug!(app_id = app_id, "Creating GitHub client from App credentials");
                create_app_client(*app_id, private_key.expose_secret(), base_uri).await?
            }
        };

        Ok(GitHubClient::new(octocrab)
            .with_retry_policy(retry)
            .with_page_size(page_size))
    }
}
