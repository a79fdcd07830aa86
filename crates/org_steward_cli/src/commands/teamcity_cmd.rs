//! TeamCity server checks.

use std::path::PathBuf;

use clap::Subcommand;
use colored::Colorize;
use org_steward_core::teamcity;
use tracing::{instrument, warn};

use super::{output_path, write_table, Context};
use crate::errors::Error;
use crate::session;

#[derive(Subcommand, Debug)]
pub enum TeamCityCommands {
    /// Check the plugins of a TeamCity data directory against a target version
    Plugins {
        /// The `plugins` folder of the TeamCity data directory
        #[arg(long)]
        plugin_dir: PathBuf,

        /// TeamCity version to check against, e.g. `2024.12`
        #[arg(long)]
        target_version: String,

        /// Do not ask the server for its current version
        #[arg(long)]
        offline: bool,

        /// Directory receiving `plugins.csv` and `installed.csv`
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report which REST endpoints the token may read
    Permissions {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the server version
    Version,
}

#[instrument(skip(ctx))]
pub async fn execute(cmd: &TeamCityCommands, ctx: &Context) -> Result<(), Error> {
    match cmd {
        TeamCityCommands::Plugins {
            plugin_dir,
            target_version,
            offline,
            output,
        } => {
            let client = if *offline {
                None
            } else {
                match session::teamcity(&ctx.config) {
                    Ok(client) => Some(client),
                    Err(e) => {
                        warn!(error = %e, "No TeamCity connection, current version unknown");
                        None
                    }
                }
            };
            let report =
                teamcity::plugin_compatibility_report(client.as_ref(), plugin_dir, target_version)
                    .await?;

            println!(
                "Current version: {}, target version: {}",
                report.current_version, target_version
            );
            let dir = output_path(output.clone(), "teamcity_plugins", "");
            std::fs::create_dir_all(&dir)?;
            write_table(&report.plugins, &dir.join("plugins.csv"))?;
            write_table(&report.installed, &dir.join("installed.csv"))
        }
        TeamCityCommands::Permissions { output } => {
            let client = session::teamcity(&ctx.config)?;
            let table = teamcity::token_permission_report(&client).await;
            for row in table.rows() {
                println!("{:<22} {}", row[0], row[2]);
            }
            write_table(&table, &output_path(output.clone(), "teamcity_permissions", "csv"))
        }
        TeamCityCommands::Version => {
            let client = session::teamcity(&ctx.config)?;
            let version = client.server_version().await?;
            println!("TeamCity {}", version.bold());
            Ok(())
        }
    }
}
