//! Credentials and authenticated clients for a command run.
//!
//! Secrets come from the environment first and the system keyring second.
//! They are held as [`SecretString`] and never written to the configuration
//! file or the logs.

use auth_handler::{
    load_app_registrations_from_env, GitHubAuthService, GitHubCredentials,
    InstallationAuthenticator, TOKEN_ENV_VAR,
};
use github_client::GitHubClient;
use keyring::Entry;
use secrecy::{ExposeSecret, SecretString};
use teamcity_client::TeamCityClient;
use tracing::{debug, info, instrument};

use crate::config::AppConfig;
use crate::errors::Error;

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;

pub const KEY_RING_SERVICE_NAME: &str = "org_steward_cli";
pub const KEY_RING_USER_TOKEN: &str = "github_token";

pub const TEAMCITY_TOKEN_ENV_VAR: &str = "TEAMCITY_TOKEN";
pub const AZURE_SAS_TOKEN_ENV_VAR: &str = "AZURE_SAS_TOKEN";

/// A GitHub client plus the token git operations authenticate with.
pub struct Session {
    pub client: GitHubClient,
    pub git_token: SecretString,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Picks the environment value when set, otherwise asks `keyring`.
pub fn token_from_sources<F>(env_value: Option<String>, keyring: F) -> Option<SecretString>
where
    F: FnOnce() -> Option<String>,
{
    non_empty(env_value)
        .or_else(|| non_empty(keyring()))
        .map(SecretString::from)
}

fn keyring_token() -> Option<String> {
    let entry = Entry::new(KEY_RING_SERVICE_NAME, KEY_RING_USER_TOKEN).ok()?;
    match entry.get_password() {
        Ok(token) => Some(token),
        Err(e) => {
            debug!(error = %e, "No GitHub token in the keyring");
            None
        }
    }
}

/// The personal access token from `GITHUB_TOKEN` or the keyring.
pub fn github_token() -> Result<SecretString, Error> {
    token_from_sources(std::env::var(TOKEN_ENV_VAR).ok(), keyring_token).ok_or_else(|| {
        Error::Auth(format!(
            "no GitHub token found; set {TOKEN_ENV_VAR} or run `org-steward auth github token`"
        ))
    })
}

/// A required secret read from the environment.
pub fn env_secret(name: &str) -> Result<SecretString, Error> {
    non_empty(std::env::var(name).ok())
        .map(SecretString::from)
        .ok_or_else(|| Error::Auth(format!("{name} is not set")))
}

/// Connects to GitHub with the configured authentication method.
///
/// `token` uses the personal access token. `app` acts as the installation on
/// `org` of the first App registered through the environment.
#[instrument(skip(config))]
pub async fn connect(config: &AppConfig, org: &str) -> Result<Session, Error> {
    let retry = config.retry.to_policy();
    let api_url = config.github.api_url.as_deref();

    match config.authentication.auth_method.as_str() {
        "token" => {
            let token = github_token()?;
            let client = token_client(config, &token).await?;
            info!("Connected to GitHub with a personal access token");
            Ok(Session {
                client,
                git_token: token,
            })
        }
        "app" => {
            let registrations = load_app_registrations_from_env()?;
            let registration = registrations.first().ok_or_else(|| {
                Error::Auth("auth_method is 'app' but no GitHub App is registered".to_string())
            })?;
            let service = GitHubAuthService::from_registration(registration)
                .with_base_uri(api_url.map(str::to_string))
                .with_retry_policy(retry);
            let installation = service
                .installations_for_org(org)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    Error::Auth(format!("{} is not installed on {org}", service.label()))
                })?;
            let (client, token) = service.installation_client(installation.id).await?;
            info!(app = service.label(), installation_id = installation.id, "Connected to GitHub as an App installation");
            Ok(Session {
                client: client.with_page_size(config.github.page_size),
                git_token: token,
            })
        }
        other => Err(Error::Config(format!(
            "unsupported auth_method '{other}', expected 'token' or 'app'"
        ))),
    }
}

async fn token_client(config: &AppConfig, token: &SecretString) -> Result<GitHubClient, Error> {
    let credentials =
        GitHubCredentials::Token(SecretString::from(token.expose_secret().to_string()));
    Ok(credentials
        .connect(
            config.github.api_url.as_deref(),
            config.retry.to_policy(),
            config.github.page_size,
        )
        .await?)
}

/// A client acting as the user behind the personal access token, whatever
/// the configured authentication method.
pub async fn user_client(config: &AppConfig) -> Result<GitHubClient, Error> {
    token_client(config, &github_token()?).await
}

/// Every GitHub App registered through the environment.
pub fn app_authenticators(
    config: &AppConfig,
) -> Result<Vec<Box<dyn InstallationAuthenticator>>, Error> {
    let registrations = load_app_registrations_from_env()?;
    if registrations.is_empty() {
        return Err(Error::Auth(
            "no GitHub App registered; set GITHUB_APP_ID_<n> and GITHUB_APP_KEY_<n>".to_string(),
        ));
    }
    Ok(registrations
        .iter()
        .map(|r| {
            Box::new(
                GitHubAuthService::from_registration(r)
                    .with_base_uri(config.github.api_url.clone())
                    .with_retry_policy(config.retry.to_policy()),
            ) as Box<dyn InstallationAuthenticator>
        })
        .collect())
}

/// Connects to the configured TeamCity server with `TEAMCITY_TOKEN`.
pub fn teamcity(config: &AppConfig) -> Result<TeamCityClient, Error> {
    let url = config
        .teamcity
        .url
        .as_deref()
        .ok_or_else(|| Error::Config("[teamcity] url is not set".to_string()))?;
    let token = env_secret(TEAMCITY_TOKEN_ENV_VAR)?;
    Ok(TeamCityClient::new(
        url,
        token,
        config.teamcity.accept_invalid_certs,
    )?)
}
