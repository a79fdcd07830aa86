//! Hard-coded secret scan over repository contents.

use std::path::PathBuf;

use clap::Subcommand;
use colored::Colorize;
use org_steward_core::secrets::{self, SecretScanner};
use tracing::{info, instrument};

use super::{output_path, write_table, Context};
use crate::errors::Error;

#[derive(Subcommand, Debug)]
pub enum SecretsCommands {
    /// Scan the default branch of a range of repositories
    Scan {
        /// Index of the first repository, in listing order
        #[arg(long, default_value_t = 0)]
        start: usize,

        /// Index one past the last repository
        #[arg(long, default_value_t = 100)]
        end: usize,

        /// Include archived repositories
        #[arg(long)]
        include_archived: bool,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[instrument(skip(ctx))]
pub async fn execute(cmd: &SecretsCommands, ctx: &Context) -> Result<(), Error> {
    match cmd {
        SecretsCommands::Scan {
            start,
            end,
            include_archived,
            output,
        } => {
            if start >= end {
                return Err(Error::InvalidArguments(format!(
                    "--start ({start}) must be below --end ({end})"
                )));
            }
            let org = ctx.org()?;
            let scanner = SecretScanner::builtin()?;
            let session = ctx.session().await?;

            let mut repos = session.client.list_org_repositories(org).await?;
            if !include_archived {
                repos.retain(|r| !r.archived);
            }
            let selected = secrets::index_range(&repos, *start, *end);
            info!(total = repos.len(), selected = selected.len(), "Scanning repositories");

            let table =
                secrets::scan_repositories(&session.client, org, selected, &scanner, ctx.workers)
                    .await?;
            if table.is_empty() {
                println!("{}", "No possible secrets found".green());
            } else {
                println!(
                    "{}",
                    format!("{} files with possible secrets", table.len()).red()
                );
            }
            write_table(&table, &output_path(output.clone(), "secret_scan", "csv"))
        }
    }
}
