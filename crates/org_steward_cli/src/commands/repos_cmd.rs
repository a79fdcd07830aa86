//! Repository lockdown, inventory and inactivity commands.

use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Subcommand;
use colored::Colorize;
use org_steward_core::batching::{DEFAULT_MAX_PER_BATCH, DEFAULT_SIZE_LIMIT_GB};
use org_steward_core::inventory::{self, DEFAULT_SPLIT_THRESHOLD_MB};
use org_steward_core::{
    batch_workbook, inactivity, load_repo_list, lockdown_repositories, unarchive_repositories,
    BatchLimits, Table,
};
use tracing::{info, instrument};

use super::{cutoff_from_days, output_path, write_table, write_workbook, Context};
use crate::errors::Error;

#[cfg(test)]
#[path = "repos_cmd_tests.rs"]
mod tests;

#[derive(Subcommand, Debug)]
pub enum ReposCommands {
    /// Make listed repositories private, archive them and strip all access
    Lockdown {
        /// Text or CSV file listing the repositories
        #[arg(long)]
        repos: PathBuf,

        /// Log the changes without making them
        #[arg(long)]
        dry_run: bool,
    },

    /// Unarchive the listed repositories
    Unarchive {
        #[arg(long)]
        repos: PathBuf,

        #[arg(long)]
        dry_run: bool,
    },

    /// Report archived repositories, most recently updated first
    Archived {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report non-archived repositories and their visibility
    Active {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report every branch of every repository
    Branches {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Estimate the full-history size of every repository
    Sizes {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Split repositories into small and large ones
    Split {
        /// Repositories at or above this size in MB count as large
        #[arg(long, default_value_t = DEFAULT_SPLIT_THRESHOLD_MB)]
        threshold_mb: f64,

        /// Directory receiving `all.csv`, `small.csv` and `large.csv`
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Plan backup batches from a size estimate CSV
    Batch {
        /// CSV written by `repos sizes`
        #[arg(long)]
        input: PathBuf,

        #[arg(long, default_value_t = DEFAULT_SIZE_LIMIT_GB)]
        size_limit_gb: f64,

        #[arg(long, default_value_t = DEFAULT_MAX_PER_BATCH)]
        max_per_batch: usize,

        /// Directory receiving one `Batch_<n>.csv` per batch
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report repositories with no branch activity in the given window
    Inactive {
        #[arg(long, default_value_t = 365)]
        days: u32,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[instrument(skip(ctx))]
pub async fn execute(cmd: &ReposCommands, ctx: &Context) -> Result<(), Error> {
    match cmd {
        ReposCommands::Lockdown { repos, dry_run } => {
            let repos = repo_list(repos)?;
            let session = ctx.session().await?;
            let summary = lockdown_repositories(&session.client, ctx.org()?, &repos, *dry_run).await?;
            println!(
                "{} processed={} made_private={} archived={} collaborators_removed={} teams_removed={} invitations_revoked={} errors={}",
                status(summary.errors),
                summary.processed,
                summary.made_private,
                summary.archived,
                summary.collaborators_removed,
                summary.teams_removed,
                summary.invitations_revoked,
                summary.errors
            );
            Ok(())
        }
        ReposCommands::Unarchive { repos, dry_run } => {
            let repos = repo_list(repos)?;
            let session = ctx.session().await?;
            let summary =
                unarchive_repositories(&session.client, ctx.org()?, &repos, *dry_run).await?;
            println!(
                "{} unarchived={} already_active={} errors={}",
                status(summary.errors),
                summary.unarchived,
                summary.already_active,
                summary.errors
            );
            Ok(())
        }
        ReposCommands::Archived { output } => {
            let session = ctx.session().await?;
            let table = inventory::archived_repository_report(&session.client, ctx.org()?).await?;
            write_table(&table, &output_path(output.clone(), "archived_repos", "csv"))
        }
        ReposCommands::Active { output } => {
            let session = ctx.session().await?;
            let table = inventory::active_repository_report(&session.client, ctx.org()?).await?;
            write_table(&table, &output_path(output.clone(), "active_repos", "csv"))
        }
        ReposCommands::Branches { output } => {
            let session = ctx.session().await?;
            let table = inventory::branch_report(&session.client, ctx.org()?, ctx.workers).await?;
            write_table(&table, &output_path(output.clone(), "repo_branches", "csv"))
        }
        ReposCommands::Sizes { output } => {
            let session = ctx.session().await?;
            let estimates = inventory::size_estimates(&session.client, ctx.org()?).await?;
            let table = inventory::size_table(&estimates);
            write_table(&table, &output_path(output.clone(), "repo_sizes", "csv"))
        }
        ReposCommands::Split {
            threshold_mb,
            output,
        } => {
            let session = ctx.session().await?;
            let repos = session.client.list_org_repositories(ctx.org()?).await?;
            let split = inventory::split_by_size(&repos, *threshold_mb);
            let dir = output_path(output.clone(), "repo_size_split", "");
            std::fs::create_dir_all(&dir)?;
            write_table(&split.all, &dir.join("all.csv"))?;
            write_table(&split.small, &dir.join("small.csv"))?;
            write_table(&split.large, &dir.join("large.csv"))
        }
        ReposCommands::Batch {
            input,
            size_limit_gb,
            max_per_batch,
            output,
        } => {
            let limits = BatchLimits {
                size_limit_gb: *size_limit_gb,
                max_per_batch: *max_per_batch,
            };
            let dir = output_path(output.clone(), "batches", "");
            plan_batches(input, limits, &dir)
        }
        ReposCommands::Inactive { days, output } => {
            let cutoff = cutoff_from_days(*days, Utc::now());
            info!(cutoff = %cutoff, "Looking for inactive repositories");
            let session = ctx.session().await?;
            let table = inactivity::find_inactive_repositories(
                &session.client,
                ctx.org()?,
                cutoff,
                ctx.workers,
            )
            .await?;
            write_table(&table, &output_path(output.clone(), "inactive_repos", "csv"))
        }
    }
}

fn repo_list(path: &Path) -> Result<Vec<String>, Error> {
    let repos = load_repo_list(path)?;
    if repos.is_empty() {
        return Err(Error::InvalidArguments(format!(
            "{} lists no repositories",
            path.display()
        )));
    }
    Ok(repos)
}

fn status(errors: usize) -> colored::ColoredString {
    if errors == 0 {
        "Done".green()
    } else {
        "Done with errors".yellow()
    }
}

/// Reads size estimates from `input` and writes one sheet per batch to `dir`.
fn plan_batches(input: &Path, limits: BatchLimits, dir: &Path) -> Result<(), Error> {
    let estimates = Table::read_csv(input)?;
    let workbook = batch_workbook(&estimates, limits)?;
    write_workbook(&workbook, dir)
}
