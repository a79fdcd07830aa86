//! Batched mirror backups.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use clap::Subcommand;
use colored::Colorize;
use org_steward_core::{run_backup, BackupOptions, UploadTarget, Workbook};
use tracing::{info, instrument, warn};

use super::Context;
use crate::errors::Error;
use crate::session::{env_secret, AZURE_SAS_TOKEN_ENV_VAR};

#[cfg(test)]
#[path = "backup_cmd_tests.rs"]
mod tests;

#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// Mirror, archive and upload every repository of the batch sheets
    Run {
        /// Directory of `Batch_<n>.csv` sheets written by `repos batch`
        #[arg(long)]
        batches: PathBuf,

        /// Overrides `[backup] output_root`
        #[arg(long)]
        output_root: Option<PathBuf>,

        /// Keep the archives local even when a storage URL is configured
        #[arg(long)]
        no_upload: bool,
    },
}

#[instrument(skip(ctx))]
pub async fn execute(cmd: &BackupCommands, ctx: &Context) -> Result<(), Error> {
    match cmd {
        BackupCommands::Run {
            batches,
            output_root,
            no_upload,
        } => {
            let workbook = Workbook::read_dir(batches)?;
            let options = backup_options(ctx, output_root.clone(), *no_upload)?;
            let org = ctx.org()?;
            let session = ctx.session().await?;

            let summary = run_backup(
                org,
                &workbook,
                Some(&session.git_token),
                &options,
                Local::now().date_naive(),
            )
            .await?;

            let line = format!(
                "cloned={} skipped={} uploaded_batches={}",
                summary.cloned, summary.skipped, summary.uploaded_batches
            );
            if summary.skipped == 0 {
                println!("{}", line.green());
            } else {
                println!("{}", line.yellow());
            }
            Ok(())
        }
    }
}

/// Backup settings from the configuration. Uploading needs the SAS token in
/// `AZURE_SAS_TOKEN`.
fn backup_options(
    ctx: &Context,
    output_root: Option<PathBuf>,
    no_upload: bool,
) -> Result<BackupOptions, Error> {
    let backup = &ctx.config.backup;
    let upload = match (&backup.storage_url, no_upload) {
        (Some(storage_url), false) => Some(UploadTarget {
            program: backup.azcopy_path.clone(),
            storage_url: storage_url.clone(),
            sas_token: env_secret(AZURE_SAS_TOKEN_ENV_VAR)?,
        }),
        (Some(_), true) => {
            info!("Upload disabled, archives stay local");
            None
        }
        (None, _) => {
            warn!("No [backup] storage_url configured, archives stay local");
            None
        }
    };

    Ok(BackupOptions {
        output_root: output_root.unwrap_or_else(|| backup.output_root.clone()),
        web_base: ctx.web_base()?,
        clone_attempts: backup.clone_attempts,
        retry_delay: Duration::from_secs(backup.retry_delay_secs),
        workers: ctx.workers,
        batch_pause: Duration::from_secs(backup.batch_pause_secs),
        upload,
    })
}
