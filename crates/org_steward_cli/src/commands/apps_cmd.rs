//! GitHub App installation reports and API usage tracking.

use std::path::PathBuf;

use auth_handler::InstallationAuthenticator;
use chrono::Utc;
use clap::Subcommand;
use org_steward_core::apps;
use tracing::instrument;

use super::{output_path, split_repository, write_workbook, Context};
use crate::errors::Error;
use crate::session;

#[cfg(test)]
#[path = "apps_cmd_tests.rs"]
mod tests;

#[derive(Subcommand, Debug)]
pub enum AppsCommands {
    /// List the repositories every App installation can reach
    Report {
        /// Directory receiving one sheet per installation
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Sample every installation's API usage and update the running totals
    RateLimits {
        /// JSON file holding the totals between runs
        #[arg(long, default_value = "rate_limit_state.json")]
        state_file: PathBuf,

        #[arg(long, default_value = "rate_limit_summary.csv")]
        summary: PathBuf,
    },

    /// Add a repository to an App's installation
    AddRepo {
        /// App label, `App<n>` for `GITHUB_APP_ID_<n>`; the first App by default
        #[arg(long)]
        app: Option<String>,

        /// `repo` or `owner/repo`
        #[arg(long)]
        repo: String,
    },
}

#[instrument(skip(ctx))]
pub async fn execute(cmd: &AppsCommands, ctx: &Context) -> Result<(), Error> {
    let authenticators = session::app_authenticators(&ctx.config)?;
    match cmd {
        AppsCommands::Report { output } => {
            let workbook = apps::installation_repository_report(&authenticators).await?;
            write_workbook(&workbook, &output_path(output.clone(), "app_repositories", ""))
        }
        AppsCommands::RateLimits { state_file, summary } => {
            let table = apps::sample_rate_limits(
                &authenticators,
                ctx.org()?,
                state_file,
                summary,
                Utc::now(),
            )
            .await?;
            println!("{}", table.headers().join(", "));
            for row in table.rows() {
                println!("{}", row.join(", "));
            }
            Ok(())
        }
        AppsCommands::AddRepo { app, repo } => {
            let org = ctx.org()?;
            let (owner, repo) = split_repository(repo, org);
            let app = select_app(&authenticators, app.as_deref())?;
            let user_client = session::user_client(&ctx.config).await?;
            let installation_id =
                apps::add_repository_to_installation(app, &user_client, owner, repo).await?;
            println!(
                "{owner}/{repo} is available to {} (installation {installation_id})",
                app.label()
            );
            Ok(())
        }
    }
}

/// The App with `label`, or the first one.
fn select_app<'a>(
    authenticators: &'a [Box<dyn InstallationAuthenticator>],
    label: Option<&str>,
) -> Result<&'a dyn InstallationAuthenticator, Error> {
    let found = match label {
        Some(label) => authenticators
            .iter()
            .find(|a| a.label().eq_ignore_ascii_case(label)),
        None => authenticators.first(),
    };
    found.map(|a| a.as_ref()).ok_or_else(|| {
        Error::InvalidArguments(format!(
            "no GitHub App labelled '{}'",
            label.unwrap_or_default()
        ))
    })
}
