//! Joins and filters over reports written by earlier runs.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use org_steward_core::tables::{self, REPOSITORY_COLUMN};
use org_steward_core::{load_repo_list, Table, Workbook};
use tracing::instrument;

use super::{output_path, write_table, write_workbook, Context};
use crate::errors::Error;
use crate::session;

#[cfg(test)]
#[path = "tables_cmd_tests.rs"]
mod tests;

#[derive(Subcommand, Debug)]
pub enum TablesCommands {
    /// Add the GitHub Apps able to reach each repository of a report
    MapApps {
        /// Directory written by `apps report`
        #[arg(long)]
        apps: PathBuf,

        /// Report with a `Repository` column, e.g. from `repos inactive`
        #[arg(long)]
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove rows listed in another report from every sheet of a workbook
    Subtract {
        /// Directory of CSV sheets
        #[arg(long)]
        workbook: PathBuf,

        /// CSV holding the values to remove
        #[arg(long)]
        exclude: PathBuf,

        #[arg(long, default_value = REPOSITORY_COLUMN)]
        column: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Keep only the rows of a report whose repository is listed
    Select {
        #[arg(long)]
        input: PathBuf,

        /// Text or CSV file listing the repositories to keep
        #[arg(long)]
        keep: PathBuf,

        #[arg(long, default_value = REPOSITORY_COLUMN)]
        column: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the TeamCity VCS roots of App-reachable repositories
    MapVcs {
        /// Report written by `tables map-apps`
        #[arg(long)]
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[instrument(skip(ctx))]
pub async fn execute(cmd: &TablesCommands, ctx: &Context) -> Result<(), Error> {
    match cmd {
        TablesCommands::MapApps {
            apps,
            input,
            output,
        } => {
            let table = map_apps(apps, input)?;
            write_table(&table, &output_path(output.clone(), "repos_with_apps", "csv"))
        }
        TablesCommands::Subtract {
            workbook,
            exclude,
            column,
            output,
        } => {
            let result = subtract(workbook, exclude, column)?;
            write_workbook(&result, &output_path(output.clone(), "subtracted", ""))
        }
        TablesCommands::Select {
            input,
            keep,
            column,
            output,
        } => {
            let table = select(input, keep, column)?;
            write_table(&table, &output_path(output.clone(), "selected", "csv"))
        }
        TablesCommands::MapVcs { input, output } => {
            let mapped = Table::read_csv(input)?;
            let teamcity = session::teamcity(&ctx.config)?;
            let roots = teamcity.list_vcs_roots().await?;
            let table = tables::map_vcs_roots(&mapped, &roots)?;
            write_table(&table, &output_path(output.clone(), "vcs_roots", "csv"))
        }
    }
}

fn map_apps(apps: &Path, input: &Path) -> Result<Table, Error> {
    let apps = Workbook::read_dir(apps)?;
    let inactive = Table::read_csv(input)?;
    Ok(tables::map_repositories_to_apps(&apps, &inactive)?)
}

fn subtract(workbook: &Path, exclude: &Path, column: &str) -> Result<Workbook, Error> {
    let workbook = Workbook::read_dir(workbook)?;
    let exclude = Table::read_csv(exclude)?;
    Ok(tables::subtract(&workbook, &exclude, column)?)
}

fn select(input: &Path, keep: &Path, column: &str) -> Result<Table, Error> {
    let table = Table::read_csv(input)?;
    let keep = load_repo_list(keep)?;
    Ok(tables::select(&table, &keep, column)?)
}
