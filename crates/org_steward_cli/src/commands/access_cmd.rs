//! Collaborator and team access commands.

use std::path::PathBuf;

use clap::Subcommand;
use colored::Colorize;
use org_steward_core::access;
use org_steward_core::load_repo_list;
use tracing::instrument;

use super::{output_path, write_table, write_workbook, Context};
use crate::errors::Error;

#[derive(Subcommand, Debug)]
pub enum AccessCommands {
    /// Report listed repositories that have no collaborators and no teams
    Audit {
        #[arg(long)]
        repos: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Grant a team access to the listed repositories
    Grant {
        /// Team slug
        #[arg(long)]
        team: String,

        #[arg(long)]
        repos: PathBuf,

        /// pull, triage, push, maintain or admin
        #[arg(long, default_value = "pull")]
        permission: String,

        #[arg(long)]
        dry_run: bool,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report every team's repositories and highest permission
    Teams {
        /// Directory receiving the report sheets
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report the direct collaborators of the listed repositories
    Collaborators {
        #[arg(long)]
        repos: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[instrument(skip(ctx))]
pub async fn execute(cmd: &AccessCommands, ctx: &Context) -> Result<(), Error> {
    match cmd {
        AccessCommands::Audit { repos, output } => {
            let repos = load_repo_list(repos)?;
            let session = ctx.session().await?;
            let table = access::audit_no_access(&session.client, ctx.org()?, &repos).await?;
            write_table(&table, &output_path(output.clone(), "repos_no_access", "csv"))
        }
        AccessCommands::Grant {
            team,
            repos,
            permission,
            dry_run,
            output,
        } => {
            let repos = load_repo_list(repos)?;
            let session = ctx.session().await?;
            let summary = access::grant_team_access(
                &session.client,
                ctx.org()?,
                team,
                &repos,
                permission,
                ctx.workers,
                *dry_run,
            )
            .await?;

            for result in &summary.results {
                let mark = if result.ok { "OK".green() } else { "FAILED".red() };
                println!("{mark} {} {}", result.repo, result.message);
            }
            println!("{}/{} repositories granted {permission} to {team}", summary.ok, summary.total);
            write_table(
                &summary.to_table(),
                &output_path(output.clone(), "team_grant", "csv"),
            )
        }
        AccessCommands::Teams { output } => {
            let session = ctx.session().await?;
            let workbook = access::team_acl_report(&session.client, ctx.org()?, ctx.workers).await?;
            write_workbook(&workbook, &output_path(output.clone(), "team_acl", ""))
        }
        AccessCommands::Collaborators { repos, output } => {
            let repos = load_repo_list(repos)?;
            let session = ctx.session().await?;
            let table = access::collaborator_report(&session.client, ctx.org()?, &repos).await?;
            write_table(&table, &output_path(output.clone(), "repo_collaborators", "csv"))
        }
    }
}
