//! Organization member reports.

use std::path::PathBuf;

use chrono::Utc;
use clap::Subcommand;
use colored::Colorize;
use org_steward_core::{inactivity, members};
use tracing::instrument;

use super::{cutoff_from_days, output_path, write_table, Context};
use crate::errors::Error;

#[derive(Subcommand, Debug)]
pub enum MembersCommands {
    /// Report members with their email, name and SSO identity
    Sso {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report members without public activity in the given window
    Inactive {
        #[arg(long, default_value_t = 90)]
        days: u32,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show a user's latest login from the audit log
    LastLogin {
        /// GitHub login
        user: String,
    },
}

#[instrument(skip(ctx))]
pub async fn execute(cmd: &MembersCommands, ctx: &Context) -> Result<(), Error> {
    let org = ctx.org()?;
    let session = ctx.session().await?;
    let client = &session.client;

    match cmd {
        MembersCommands::Sso { output } => {
            let table = members::member_sso_report(client, org).await?;
            write_table(&table, &output_path(output.clone(), "member_sso", "csv"))
        }
        MembersCommands::Inactive { days, output } => {
            let cutoff = cutoff_from_days(*days, Utc::now());
            let table = inactivity::find_inactive_members(client, org, cutoff).await?;
            write_table(&table, &output_path(output.clone(), "inactive_members", "csv"))
        }
        MembersCommands::LastLogin { user } => {
            match inactivity::last_login(client, org, user).await? {
                Some(login) => println!(
                    "{user} last logged in at {} ({})",
                    login.at.to_rfc3339().green(),
                    login.phrase
                ),
                None => println!(
                    "{}",
                    format!("No login found for {user} within the audit log retention window")
                        .yellow()
                ),
            }
            Ok(())
        }
    }
}
