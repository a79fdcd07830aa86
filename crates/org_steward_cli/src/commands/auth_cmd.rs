//! Authentication command module for GitHub credentials management.
//!
//! A personal access token is stored in the system keyring. GitHub Apps are
//! registered through `GITHUB_APP_ID_<n>` / `GITHUB_APP_KEY_<n>` environment
//! variables; this command only checks they are present and switches the
//! configured method.

use std::io::{BufRead, Write};
use std::path::Path;

use auth_handler::load_app_registrations;
use clap::Subcommand;
use colored::Colorize;
use keyring::Entry;
use tracing::{debug, error, info, instrument};

use crate::config::AppConfig;
use crate::errors::Error;
use crate::session::{KEY_RING_SERVICE_NAME, KEY_RING_USER_TOKEN};

#[cfg(test)]
#[path = "auth_cmd_tests.rs"]
mod tests;

/// Authentication subcommands for managing GitHub credentials.
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Configure GitHub authentication credentials.
    #[command(name = "github")]
    GitHub {
        /// Authentication method to configure.
        ///
        /// - "token": Personal Access Token, stored in the system keyring
        /// - "app": GitHub Apps registered through the environment
        #[arg(default_value = "token")]
        method: String,
    },
}

/// Executes the specified authentication command.
#[instrument(skip(config_path))]
pub async fn execute(cmd: &AuthCommands, config_path: &Path) -> Result<(), Error> {
    match cmd {
        AuthCommands::GitHub { method } => {
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            auth_github(method, config_path, &mut input, store_token_in_keyring, |name| {
                std::env::var(name).ok()
            })
        }
    }
}

fn store_token_in_keyring(token: &str) -> Result<(), Error> {
    let keyring = Entry::new(KEY_RING_SERVICE_NAME, KEY_RING_USER_TOKEN)
        .map_err(|e| Error::Auth(format!("Failed to create an entry in the keyring: {}", e)))?;
    keyring
        .set_password(token)
        .map_err(|e| Error::Auth(format!("Failed to save token to keyring: {}", e)))?;
    debug!(message = "Saved token to keyring");
    Ok(())
}

fn read_line(input: &mut impl BufRead) -> Result<String, Error> {
    let mut line = String::new();
    input
        .read_line(&mut line)
        .map_err(|e| Error::Auth(format!("Failed to read input: {}", e)))?;
    Ok(line.trim().to_string())
}

/// Configures GitHub authentication based on the specified method and records
/// the method in the configuration file.
fn auth_github<R, S, L>(
    method: &str,
    config_path: &Path,
    input: &mut R,
    store_token: S,
    lookup: L,
) -> Result<(), Error>
where
    R: BufRead,
    S: FnOnce(&str) -> Result<(), Error>,
    L: Fn(&str) -> Option<String>,
{
    debug!(message = "Authenticating with GitHub", method = method);
    let mut config = AppConfig::load_or_default(config_path)?;

    match method {
        "token" => {
            info!(message = "GitHub Personal Access Token Authentication");
            println!("GitHub Personal Access Token Authentication");
            println!("------------------------------------------");
            print!("Personal Access Token: ");
            std::io::stdout()
                .flush()
                .map_err(|_| Error::StdOutFlushFailed)?;

            let token = read_line(input)?;
            debug!(message = "Read token from stdin");
            if token.is_empty() {
                let err = Error::Auth("Token cannot be empty".to_string());
                error!(message = "Token cannot be empty", error = ?err);
                return Err(err);
            }
            store_token(&token)?;
        }
        "app" => {
            info!(message = "GitHub App Authentication");
            let registrations = load_app_registrations(lookup)?;
            if registrations.is_empty() {
                let err = Error::Auth(
                    "No GitHub App registered; set GITHUB_APP_ID_1 and GITHUB_APP_KEY_1 (or GITHUB_APP_KEY_PATH_1)"
                        .to_string(),
                );
                error!(message = "No GitHub App registered", error = ?err);
                return Err(err);
            }
            for registration in &registrations {
                println!(
                    "Found {} (App ID {})",
                    registration.label(),
                    registration.app_id
                );
            }
        }
        _ => {
            let err =
                Error::InvalidArguments(format!("Unsupported authentication method: {}", method));
            error!(message = "Unsupported authentication method", method = method, error = ?err);
            return Err(err);
        }
    }

    config.authentication.auth_method = method.to_string();
    config.save(config_path)?;
    info!(
        message = "Updated configuration with auth method",
        auth_method = method
    );
    println!(
        "{}",
        format!("GitHub {method} authentication configured successfully!").green()
    );
    Ok(())
}
