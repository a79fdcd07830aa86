//! Command modules for the org-steward CLI.
//!
//! Each submodule handles one command group and exposes a clap `Subcommand`
//! enum plus an `execute` function:
//!
//! - `auth_cmd`: store GitHub credentials
//! - `config_cmd`: show or create the configuration file
//! - `repos_cmd`: lockdown, inventory, sizing and inactivity reports
//! - `access_cmd`: collaborator and team access audits and grants
//! - `protect_cmd`: branch protection, CODEOWNERS and exports
//! - `apps_cmd`: GitHub App installation reports and usage tracking
//! - `members_cmd`: member directory, inactivity and last login
//! - `workflows_cmd`, `secrets_cmd`, `backup_cmd`, `surgery_cmd`
//! - `tables_cmd`: joins and filters over earlier reports
//! - `teamcity_cmd`: TeamCity plugin, token and version checks

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use org_steward_core::report::timestamped_name;
use org_steward_core::{Table, Workbook};
use url::Url;

use crate::config::AppConfig;
use crate::errors::Error;
use crate::session::{self, Session};

pub mod access_cmd;
pub mod apps_cmd;
pub mod auth_cmd;
pub mod backup_cmd;
pub mod config_cmd;
pub mod members_cmd;
pub mod protect_cmd;
pub mod repos_cmd;
pub mod secrets_cmd;
pub mod surgery_cmd;
pub mod tables_cmd;
pub mod teamcity_cmd;
pub mod workflows_cmd;

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;

/// Settings shared by every command of one run.
#[derive(Debug)]
pub struct Context {
    pub config: AppConfig,
    pub config_path: PathBuf,
    org: String,
    pub workers: usize,
}

impl Context {
    /// Applies the `--org` and `--workers` overrides to `config`.
    pub fn new(
        config: AppConfig,
        config_path: PathBuf,
        org: Option<String>,
        workers: Option<usize>,
    ) -> Self {
        let org = org.unwrap_or_else(|| config.github.org.clone());
        let workers = workers.unwrap_or(config.concurrency.workers).max(1);
        Self {
            config,
            config_path,
            org,
            workers,
        }
    }

    /// The organization to work on.
    pub fn org(&self) -> Result<&str, Error> {
        let org = self.org.trim();
        if org.is_empty() {
            Err(Error::InvalidArguments(
                "no organization given; pass --org or set [github] org".to_string(),
            ))
        } else {
            Ok(org)
        }
    }

    pub async fn session(&self) -> Result<Session, Error> {
        session::connect(&self.config, self.org()?).await
    }

    /// Web root for clone URLs, always ending in `/`.
    pub fn web_base(&self) -> Result<Url, Error> {
        let mut raw = self.config.github.web_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(|e| Error::Config(format!("invalid [github] web_url '{raw}': {e}")))
    }
}

/// `explicit`, or `<prefix>_<timestamp>[.<extension>]` in the current directory.
pub fn output_path(explicit: Option<PathBuf>, prefix: &str, extension: &str) -> PathBuf {
    explicit.unwrap_or_else(|| PathBuf::from(timestamped_name(prefix, extension, Utc::now())))
}

/// Start of the activity window `days` back from `now`.
pub fn cutoff_from_days(days: u32, now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(i64::from(days))
}

pub fn write_table(table: &Table, path: &Path) -> Result<(), Error> {
    table.write_csv(path)?;
    println!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

pub fn write_workbook(workbook: &Workbook, dir: &Path) -> Result<(), Error> {
    workbook.write_dir(dir)?;
    println!("Wrote {} sheets to {}", workbook.len(), dir.display());
    Ok(())
}

/// Splits `owner/repo`, defaulting the owner to `org`.
pub fn split_repository<'a>(value: &'a str, org: &'a str) -> (&'a str, &'a str) {
    match value.trim().split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() => (owner, repo),
        _ => (org, value.trim()),
    }
}
