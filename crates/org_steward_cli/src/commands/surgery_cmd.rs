//! Repository surgery: folder moves and dated snapshots.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::Subcommand;
use colored::Colorize;
use org_steward_core::git::repository_url;
use org_steward_core::{move_folder, snapshot_at, SnapshotTarget};
use tempfile::TempDir;
use tracing::{info, instrument};

use super::{split_repository, Context};
use crate::errors::Error;

#[cfg(test)]
#[path = "surgery_cmd_tests.rs"]
mod tests;

#[derive(Subcommand, Debug)]
pub enum SurgeryCommands {
    /// Copy a folder of one repository into another and push the result
    MoveFolder {
        /// `repo` or `owner/repo` holding the folder
        #[arg(long)]
        source: String,

        /// `repo` or `owner/repo` receiving the folder
        #[arg(long)]
        dest: String,

        /// Folder path inside the source repository
        #[arg(long)]
        folder: String,

        /// Parent folder inside the destination; the repository root by default
        #[arg(long, default_value = "")]
        dest_subdir: String,

        /// Where the clones are made; a temporary directory by default
        #[arg(long)]
        workdir: Option<PathBuf>,
    },

    /// Create a new private repository holding every branch as of a date
    Snapshot {
        /// Repository to copy
        #[arg(long)]
        repo: String,

        /// Name of the repository to create
        #[arg(long)]
        new_repo: String,

        /// Last day included, `YYYY-MM-DD`
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,

        #[arg(long)]
        workdir: Option<PathBuf>,
    },
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

/// The directory clones go to, creating a temporary one when none is given.
/// The returned guard removes the temporary directory on drop.
fn work_directory(explicit: Option<&Path>) -> Result<(PathBuf, Option<TempDir>), Error> {
    match explicit {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            Ok((dir.to_path_buf(), None))
        }
        None => {
            let temp = TempDir::new()?;
            Ok((temp.path().to_path_buf(), Some(temp)))
        }
    }
}

#[instrument(skip(ctx))]
pub async fn execute(cmd: &SurgeryCommands, ctx: &Context) -> Result<(), Error> {
    let org = ctx.org()?;
    let web_base = ctx.web_base()?;

    match cmd {
        SurgeryCommands::MoveFolder {
            source,
            dest,
            folder,
            dest_subdir,
            workdir,
        } => {
            let (source_owner, source_repo) = split_repository(source, org);
            let (dest_owner, dest_repo) = split_repository(dest, org);
            let source_url = repository_url(&web_base, source_owner, source_repo)?;
            let dest_url = repository_url(&web_base, dest_owner, dest_repo)?;
            let (dir, _guard) = work_directory(workdir.as_deref())?;
            let session = ctx.session().await?;
            let token = session.git_token;
            let (folder, dest_subdir) = (folder.clone(), dest_subdir.clone());

            info!(source = %source_url, dest = %dest_url, folder = %folder, "Moving folder");
            let outcome = tokio::task::spawn_blocking(move || {
                move_folder(
                    &source_url,
                    &dest_url,
                    &folder,
                    &dest_subdir,
                    Some(&token),
                    &dir,
                )
            })
            .await
            .map_err(|e| Error::Operation(org_steward_core::Error::GitOperation(e.to_string())))??;

            match outcome.commit {
                Some(commit) => println!(
                    "{} {} files into {} on {} ({})",
                    "Moved".green(),
                    outcome.files,
                    outcome.destination,
                    outcome.branch,
                    commit
                ),
                None => println!(
                    "{}",
                    format!("{} already holds this content, nothing pushed", outcome.destination)
                        .yellow()
                ),
            }
            Ok(())
        }
        SurgeryCommands::Snapshot {
            repo,
            new_repo,
            date,
            workdir,
        } => {
            let (dir, _guard) = work_directory(workdir.as_deref())?;
            let session = ctx.session().await?;
            let target = SnapshotTarget {
                web_base: &web_base,
                token: Some(&session.git_token),
                workdir: &dir,
            };
            let outcome = snapshot_at(&session.client, org, repo, new_repo, *date, &target).await?;

            for (branch, sha) in &outcome.branches {
                println!("{} {branch} at {sha}", "Pushed".green());
            }
            for branch in &outcome.skipped {
                println!("{} {branch}", "Skipped".yellow());
            }
            if let Some(default_branch) = &outcome.default_branch {
                println!("Default branch of {new_repo} set to {default_branch}");
            }
            Ok(())
        }
    }
}
