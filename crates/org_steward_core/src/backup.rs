//! Batched mirror backups uploaded to Azure Blob Storage with AzCopy.
//!
//! Every batch sheet is cloned and archived before its archives are uploaded.
//! Archives land in an `odd` or `even` folder picked by the day of the month,
//! so two consecutive days never overwrite each other.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use futures::stream::{self, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;
use tracing::{error, info, instrument, warn};
use url::Url;
use walkdir::WalkDir;
use zip::write::{FileOptions, ZipWriter};

use crate::errors::{Error, Result};
use crate::git;
use crate::report::Workbook;

#[cfg(test)]
#[path = "backup_tests.rs"]
mod tests;

pub const DEFAULT_CLONE_ATTEMPTS: u32 = 3;
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_secs(300);

/// Column of the batch sheets holding repository names.
pub const NAME_COLUMN: &str = "name";

/// Where and how archives are uploaded.
#[derive(Debug)]
pub struct UploadTarget {
    /// Path of the `azcopy` executable
    pub program: PathBuf,
    /// Container URL without query string
    pub storage_url: String,
    pub sas_token: SecretString,
}

impl UploadTarget {
    /// Arguments passed to AzCopy for uploading `dir/*.zip` into `folder`.
    pub fn arguments(&self, dir: &Path, folder: &str) -> Vec<String> {
        self.arguments_with_sas(dir, folder, self.sas_token.expose_secret())
    }

    /// The command line with the SAS token masked, for logging.
    pub fn redacted_command(&self, dir: &Path, folder: &str) -> String {
        let args = self.arguments_with_sas(dir, folder, "***");
        format!("{} {}", self.program.display(), args.join(" "))
    }

    fn arguments_with_sas(&self, dir: &Path, folder: &str, sas: &str) -> Vec<String> {
        let sas = sas.trim_start_matches('?');
        vec![
            "copy".to_string(),
            dir.join("*.zip").display().to_string(),
            format!("{}/{folder}?{sas}", self.storage_url.trim_end_matches('/')),
            "--recursive=true".to_string(),
        ]
    }
}

#[derive(Debug)]
pub struct BackupOptions {
    pub output_root: PathBuf,
    /// Base of the HTTPS clone URLs, e.g. `https://github.com/`
    pub web_base: Url,
    pub clone_attempts: u32,
    pub retry_delay: Duration,
    pub workers: usize,
    pub batch_pause: Duration,
    /// `None` keeps the archives local
    pub upload: Option<UploadTarget>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackupSummary {
    pub cloned: usize,
    pub skipped: usize,
    pub uploaded_batches: usize,
}

/// `odd` or `even`, by day of the month.
pub fn date_folder(today: NaiveDate) -> &'static str {
    if today.day() % 2 == 1 {
        "odd"
    } else {
        "even"
    }
}

/// Archives the contents of `src` into `zip_path`, paths relative to `src`.
///
/// Returns the number of files written.
pub fn zip_directory(src: &Path, zip_path: &Path) -> Result<u64> {
    let mut zip = ZipWriter::new(File::create(zip_path)?);
    let mut files = 0;

    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::InvalidInput(e.to_string()))?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            zip.add_directory::<_, ()>(name, FileOptions::default())?;
        } else {
            let size = entry.metadata().map_err(|e| Error::Io(e.into()))?.len();
            let options = FileOptions::<()>::default().large_file(size >= u64::from(u32::MAX));
            zip.start_file(name, options)?;
            io::copy(&mut File::open(entry.path())?, &mut zip)?;
            files += 1;
        }
    }
    zip.finish()?;
    Ok(files)
}

async fn clone_with_retries(
    url: Url,
    dest: PathBuf,
    token: Option<&SecretString>,
    attempts: u32,
    retry_delay: Duration,
) -> Result<()> {
    let attempts = attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        info!(dest = %dest.display(), attempt = attempt, "Cloning");
        if dest.exists() {
            git::remove_dir_best_effort(&dest);
        }
        let (url, target) = (url.clone(), dest.clone());
        let token = token.map(|t| SecretString::from(t.expose_secret().to_string()));
        let result = tokio::task::spawn_blocking(move || {
            git::mirror_clone(&url, &target, token.as_ref()).map(|_| ())
        })
        .await
        .map_err(|e| Error::GitOperation(format!("clone task failed: {e}")))
        .and_then(|r| r);

        match result {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(dest = %dest.display(), attempt = attempt, error = %e, "Clone attempt failed");
                last_error = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(retry_delay).await;
                } else if dest.exists() {
                    git::remove_dir_best_effort(&dest);
                }
            }
        }
    }
    Err(last_error.unwrap_or_else(|| Error::GitOperation("clone was not attempted".to_string())))
}

/// Mirrors one repository into `dir`, archives it as `<repo>.zip` and removes
/// the mirror.
#[instrument(skip(token, options))]
pub async fn backup_repository(
    org: &str,
    repo: &str,
    dir: &Path,
    token: Option<&SecretString>,
    options: &BackupOptions,
) -> Result<PathBuf> {
    let url = git::repository_url(&options.web_base, org, repo)?;
    let mirror = dir.join(repo);
    clone_with_retries(
        url,
        mirror.clone(),
        token,
        options.clone_attempts,
        options.retry_delay,
    )
    .await?;

    let zip_path = dir.join(format!("{repo}.zip"));
    let (src, dest) = (mirror.clone(), zip_path.clone());
    let files = tokio::task::spawn_blocking(move || zip_directory(&src, &dest))
        .await
        .map_err(|e| Error::GitOperation(format!("archive task failed: {e}")))??;
    git::remove_dir_best_effort(&mirror);

    info!(repo = repo, files = files, zip = %zip_path.display(), "Archived mirror");
    Ok(zip_path)
}

/// Uploads `dir/*.zip` into `folder` of the target container.
pub async fn upload_archives(target: &UploadTarget, dir: &Path, folder: &str) -> Result<()> {
    info!(command = %target.redacted_command(dir, folder), "Uploading archives");
    let output = Command::new(&target.program)
        .args(target.arguments(dir, folder))
        .output()
        .await?;

    if output.status.success() {
        info!(folder = folder, "Upload complete");
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        Err(Error::ExternalCommand {
            command: target.redacted_command(dir, folder),
            code: output.status.code(),
            stderr: if stderr.trim().is_empty() { stdout } else { stderr },
        })
    }
}

/// Backs up every repository named in the batch sheets of `batches`.
///
/// Batches run in order. Inside a batch, `workers` repositories are cloned at
/// once. After each batch the archives are uploaded and the run pauses before
/// the next batch. A repository that cannot be cloned is skipped.
#[instrument(skip(batches, token, options), fields(batches = batches.len()))]
pub async fn run_backup(
    org: &str,
    batches: &Workbook,
    token: Option<&SecretString>,
    options: &BackupOptions,
    today: NaiveDate,
) -> Result<BackupSummary> {
    let folder = date_folder(today);
    let dir = options.output_root.join(folder);
    fs::create_dir_all(&dir)?;
    info!(dir = %dir.display(), "Backing up into date folder");

    let mut summary = BackupSummary::default();
    let count = batches.len();

    for (index, (sheet, table)) in batches.sheets().iter().enumerate() {
        let column = table.require_column(NAME_COLUMN, sheet)?;
        let repos: Vec<String> = table
            .rows()
            .iter()
            .map(|r| r[column].trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        info!(batch = %sheet, repos = repos.len(), "Starting batch");

        let results: Vec<_> = stream::iter(repos)
            .map(|repo| {
                let dir = dir.clone();
                async move {
                    let result = backup_repository(org, &repo, &dir, token, options).await;
                    (repo, result)
                }
            })
            .buffer_unordered(options.workers.max(1))
            .collect()
            .await;

        for (repo, result) in results {
            match result {
                Ok(_) => summary.cloned += 1,
                Err(e) => {
                    error!(repo = %repo, error = %e, "Skipping repository");
                    summary.skipped += 1;
                }
            }
        }

        match &options.upload {
            Some(target) => match upload_archives(target, &dir, folder).await {
                Ok(()) => summary.uploaded_batches += 1,
                Err(e) => error!(batch = %sheet, error = %e, "Upload failed"),
            },
            None => info!(batch = %sheet, "No upload target configured, archives kept locally"),
        }

        if index + 1 < count && !options.batch_pause.is_zero() {
            info!(seconds = options.batch_pause.as_secs(), "Pausing before next batch");
            tokio::time::sleep(options.batch_pause).await;
        }
    }

    info!(
        cloned = summary.cloned,
        skipped = summary.skipped,
        uploaded_batches = summary.uploaded_batches,
        "Backup finished"
    );
    Ok(summary)
}
