//! Loading GitHub App registrations from numbered environment variables.
//!
//! App `n` is configured with `GITHUB_APP_ID_<n>` plus either the PEM contents
//! in `GITHUB_APP_KEY_<n>` or a path to the PEM file in
//! `GITHUB_APP_KEY_PATH_<n>`. Numbers do not need to be contiguous.

use std::path::PathBuf;

use secrecy::SecretString;
use tracing::{debug, info};

use crate::{AuthError, AuthResult, GitHubCredentials};

#[cfg(test)]
#[path = "app_registry_tests.rs"]
mod tests;

pub const APP_ID_VAR_PREFIX: &str = "GITHUB_APP_ID_";
pub const APP_KEY_VAR_PREFIX: &str = "GITHUB_APP_KEY_";
pub const APP_KEY_PATH_VAR_PREFIX: &str = "GITHUB_APP_KEY_PATH_";

/// Highest App number probed.
pub const MAX_APP_REGISTRATIONS: usize = 20;

/// One configured GitHub App.
#[derive(Clone, Debug)]
pub struct AppRegistration {
    /// The `<n>` of the environment variables
    pub index: usize,
    pub app_id: u64,
    pub private_key: SecretString,
}

impl AppRegistration {
    /// Default report label, `App<n>`.
    pub fn label(&self) -> String {
        format!("App{}", self.index)
    }

    pub fn credentials(&self) -> GitHubCredentials {
        GitHubCredentials::App {
            app_id: self.app_id,
            private_key: self.private_key.clone(),
        }
    }
}

/// Reads App registrations through `lookup`, which maps a variable name to its
/// value.
///
/// # Errors
///
/// Returns `AuthError::MissingCredentials` when an App ID has no key, and
/// `AuthError::Other` when an ID is not numeric or a key file is unreadable.
pub fn load_app_registrations<F>(lookup: F) -> AuthResult<Vec<AppRegistration>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut apps = Vec::new();

    for index in 1..=MAX_APP_REGISTRATIONS {
        let Some(raw_id) = lookup(&format!("{APP_ID_VAR_PREFIX}{index}")) else {
            continue;
        };
        let app_id: u64 = raw_id.trim().parse().map_err(|_| {
            AuthError::Other(format!(
                "{APP_ID_VAR_PREFIX}{index} is not a numeric App ID"
            ))
        })?;

        let private_key = match lookup(&format!("{APP_KEY_VAR_PREFIX}{index}")) {
            Some(pem) if !pem.trim().is_empty() => pem,
            _ => match lookup(&format!("{APP_KEY_PATH_VAR_PREFIX}{index}")) {
                Some(path) => {
                    let path = PathBuf::from(path.trim());
                    debug!(index = index, path = %path.display(), "Reading App private key file");
                    std::fs::read_to_string(&path).map_err(|e| {
                        AuthError::Other(format!(
                            "Failed to read private key file {}: {e}",
                            path.display()
                        ))
                    })?
                }
                None => {
                    return Err(AuthError::MissingCredentials(format!(
                        "App {index} has an ID but neither {APP_KEY_VAR_PREFIX}{index} nor {APP_KEY_PATH_VAR_PREFIX}{index} is set"
                    )))
                }
            },
        };

        apps.push(AppRegistration {
            index,
            app_id,
            private_key: SecretString::from(private_key),
        });
    }

    info!(count = apps.len(), "Loaded GitHub App registrations");
    Ok(apps)
}

/// Reads App registrations from the process environment.
pub fn load_app_registrations_from_env() -> AuthResult<Vec<AppRegistration>> {
    load_app_registrations(|name| std::env::var(name).ok())
}
