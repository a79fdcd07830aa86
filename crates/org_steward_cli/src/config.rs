//! Configuration management for the org-steward CLI.
//!
//! Settings live in a TOML file (`org-steward.toml` in the current directory
//! unless `--config` names another one). Every section and every key is
//! optional; a missing file means all defaults. Credentials are never stored
//! here, see [`crate::session`].

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use github_client::RetryPolicy;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::Error;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "org-steward.toml";

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Main configuration structure for the org-steward CLI.
///
/// # Example TOML Configuration
///
/// ```toml
/// [github]
/// org = "acme"
///
/// [concurrency]
/// workers = 16
///
/// [teamcity]
/// url = "https://teamcity.example.com"
/// accept_invalid_certs = true
///
/// [backup]
/// output_root = "/data/backups"
/// storage_url = "https://acct.blob.core.windows.net/github-backups"
/// ```
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    #[serde(default)]
    pub teamcity: TeamCityConfig,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub authentication: AuthenticationConfig,
}

impl AppConfig {
    /// Loads configuration from a TOML file at the specified path.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the file does not exist, cannot be read or
    /// does not parse.
    pub fn load(path: &Path) -> Result<Self, Error> {
        debug!("Loading configuration from {:?}", path);

        if !path.exists() {
            return Err(Error::Config(format!(
                "Configuration file not found: {:?}",
                path
            )));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read configuration file: {}", e)))?;

        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse configuration file: {}", e)))?;

        Ok(config)
    }

    /// Like [`AppConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, Error> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("No configuration file at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Saves the configuration as pretty TOML, creating parent directories
    /// as needed and overwriting any existing file.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        debug!("Saving configuration to {:?}", path);

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize configuration: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create directory: {}", e)))?;
        }

        fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write configuration file: {}", e)))?;

        info!("Configuration saved to {:?}", path);
        Ok(())
    }
}

/// Organization and endpoint settings.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GitHubConfig {
    /// Organization every command works on unless `--org` is given
    pub org: String,

    /// REST API root for GitHub Enterprise Server; unset means api.github.com
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Web root used to build clone URLs
    pub web_url: String,

    pub page_size: u32,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            org: String::new(),
            api_url: None,
            web_url: "https://github.com/".to_string(),
            page_size: 100,
        }
    }
}

/// Retry behaviour of the GitHub client.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_secs: u64,
    pub max_rate_limit_wait_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1000,
            max_delay_secs: 60,
            max_rate_limit_wait_secs: 900,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_secs(self.max_delay_secs),
            max_rate_limit_wait: Duration::from_secs(self.max_rate_limit_wait_secs),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Concurrent requests or clones for bulk operations
    pub workers: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            workers: org_steward_core::DEFAULT_WORKERS,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TeamCityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Skip TLS certificate validation, for servers with self-signed certificates
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackupConfig {
    pub output_root: PathBuf,
    pub clone_attempts: u32,
    pub retry_delay_secs: u64,
    pub azcopy_path: PathBuf,

    /// Blob container URL without SAS token; unset keeps archives local
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_url: Option<String>,

    pub batch_pause_secs: u64,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("backups"),
            clone_attempts: org_steward_core::backup::DEFAULT_CLONE_ATTEMPTS,
            retry_delay_secs: 5,
            azcopy_path: PathBuf::from("azcopy"),
            storage_url: None,
            batch_pause_secs: org_steward_core::backup::DEFAULT_BATCH_PAUSE.as_secs(),
        }
    }
}

/// Configuration for CLI authentication settings.
///
/// # Fields
///
/// * `auth_method` - `token` for a personal access token, `app` for the
///   first GitHub App registered through the environment (defaults to "token")
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct AuthenticationConfig {
    #[serde(default = "AuthenticationConfig::default_auth_method")]
    pub auth_method: String,
}

impl AuthenticationConfig {
    fn default_auth_method() -> String {
        "token".to_string()
    }

    pub fn new() -> Self {
        AuthenticationConfig {
            auth_method: Self::default_auth_method(),
        }
    }
}

impl Default for AuthenticationConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves the path to the configuration file.
///
/// - If `config_path` is `Some(path)`, returns that path as a `PathBuf`
/// - If `config_path` is `None`, returns `./org-steward.toml`
pub fn get_config_path(config_path: Option<&str>) -> PathBuf {
    if let Some(path) = config_path {
        PathBuf::from(path)
    } else {
        let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        current_dir.join(DEFAULT_CONFIG_FILENAME)
    }
}
