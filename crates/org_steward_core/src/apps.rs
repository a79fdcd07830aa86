//! GitHub App installation reports and API usage tracking.
//!
//! Usage tracking keeps one JSON state file. Each run samples the `core` rate
//! limit of every installation on the organization and adds the calls made
//! since the previous sample to today's bucket. Buckets older than 30 days are
//! dropped.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use auth_handler::InstallationAuthenticator;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use github_client::GitHubClient;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::errors::{Error, Result};
use crate::report::{Table, Workbook};

#[cfg(test)]
#[path = "apps_tests.rs"]
mod tests;

pub const REPOSITORY_NAME_COLUMN: &str = "Repository Name";

/// Number of daily buckets kept, today included.
pub const RETENTION_DAYS: i64 = 30;

const SHEET_NAME_LEN: usize = 30;

/// Lists the repositories every installation of every App can reach.
///
/// One sheet per installation, named `<account>_<app label>` cut to 30
/// characters. Names that collide after the cut get a numeric suffix.
#[instrument(skip(apps), fields(apps = apps.len()))]
pub async fn installation_repository_report(
    apps: &[Box<dyn InstallationAuthenticator>],
) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    for app in apps {
        let installations = match app.installations().await {
            Ok(i) => i,
            Err(e) => {
                error!(app = app.label(), error = %e, "Failed to list installations");
                continue;
            }
        };
        for installation in installations {
            let sheet: String = format!("{}_{}", installation.account.login, app.label())
                .chars()
                .take(SHEET_NAME_LEN)
                .collect();
            info!(app = app.label(), account = %installation.account.login, "Fetching installation repositories");

            let repos = match app.installation_client(installation.id).await {
                Ok((client, _token)) => client.list_installation_repositories().await,
                Err(e) => {
                    error!(installation_id = installation.id, error = %e, "Failed to authenticate installation");
                    continue;
                }
            };
            let repos = match repos {
                Ok(r) => r,
                Err(e) => {
                    error!(installation_id = installation.id, error = %e, "Failed to list installation repositories");
                    continue;
                }
            };

            let mut table = Table::new([REPOSITORY_NAME_COLUMN]);
            for repo in repos {
                let name = if repo.full_name.is_empty() {
                    repo.name
                } else {
                    repo.full_name
                };
                table.push_row([name]);
            }
            let sheet = workbook.add_unique_sheet(&sheet, table);
            info!(sheet = %sheet, "Added installation sheet");
        }
    }
    Ok(workbook)
}

/// Usage state of one installation.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct UsageRecord {
    pub app_slug: String,
    pub installation_id: u64,
    pub last_core_used: Option<u64>,
    pub last_core_limit: Option<u64>,
    pub last_ts: Option<String>,
    pub last_hour_count: u64,
    /// `YYYY-MM-DD` -> calls made that day
    #[serde(default)]
    pub daily_counts: BTreeMap<String, u64>,
    #[serde(default)]
    pub total_calls_alltime: u64,
}

impl UsageRecord {
    pub fn new(app_slug: &str, installation_id: u64) -> Self {
        Self {
            app_slug: app_slug.to_string(),
            installation_id,
            ..Default::default()
        }
    }

    /// Folds a new sample into the record and returns the calls counted.
    pub fn record_sample(&mut self, used: u64, limit: u64, now: DateTime<Utc>) -> u64 {
        let delta = usage_delta(self.last_core_used, self.last_core_limit, used);
        let today = now.date_naive();
        let today_key = today.format("%Y-%m-%d").to_string();

        self.last_hour_count = delta;
        self.last_core_used = Some(used);
        self.last_core_limit = Some(limit);
        self.last_ts = Some(now.to_rfc3339());
        *self.daily_counts.entry(today_key).or_insert(0) += delta;
        prune_daily_counts(&mut self.daily_counts, today);
        self.total_calls_alltime += delta;
        delta
    }

    pub fn today_total(&self, today: NaiveDate) -> u64 {
        self.daily_counts
            .get(&today.format("%Y-%m-%d").to_string())
            .copied()
            .unwrap_or(0)
    }

    pub fn window_total(&self) -> u64 {
        self.daily_counts.values().sum()
    }
}

/// Calls made between two samples of `core.used`.
///
/// The first sample counts everything used so far. When `used` went down the
/// window was reset in between, so the remainder of the previous window is
/// added to the new usage. A result below zero falls back to `used`.
pub fn usage_delta(prev_used: Option<u64>, prev_limit: Option<u64>, used: u64) -> u64 {
    match (prev_used, prev_limit) {
        (None, _) => used,
        (Some(prev), _) if used >= prev => used - prev,
        (Some(prev), Some(limit)) if limit > 0 => {
            limit.saturating_add(used).checked_sub(prev).unwrap_or(used)
        }
        (Some(_), _) => used,
    }
}

/// Drops buckets older than [`RETENTION_DAYS`] and keys that are not dates.
pub fn prune_daily_counts(daily_counts: &mut BTreeMap<String, u64>, today: NaiveDate) {
    let cutoff = today - Duration::days(RETENTION_DAYS - 1);
    daily_counts.retain(|key, _| {
        NaiveDate::parse_from_str(key, "%Y-%m-%d").is_ok_and(|day| day >= cutoff)
    });
}

/// Usage records keyed by `<app_slug>|<installation_id>`.
pub type UsageAggregates = BTreeMap<String, UsageRecord>;

/// Reads the state file. A missing or unreadable file starts a fresh state.
pub fn load_aggregates(path: &Path) -> UsageAggregates {
    let Ok(text) = fs::read_to_string(path) else {
        return UsageAggregates::new();
    };
    serde_json::from_str(&text).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Ignoring unreadable usage state");
        UsageAggregates::new()
    })
}

pub fn save_aggregates(path: &Path, aggregates: &UsageAggregates) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(aggregates)?)?;
    Ok(())
}

/// Samples the rate limit of every installation on `org` and updates the
/// state file.
///
/// Returns the summary table (`app_slug, installation_id, last_timestamp,
/// last_hour_count, today_total, last_30d_total`), which is also written to
/// `summary_csv` when it has rows.
#[instrument(skip(apps, state_file, summary_csv), fields(apps = apps.len()))]
pub async fn sample_rate_limits(
    apps: &[Box<dyn InstallationAuthenticator>],
    org: &str,
    state_file: &Path,
    summary_csv: &Path,
    now: DateTime<Utc>,
) -> Result<Table> {
    let mut aggregates = load_aggregates(state_file);
    let mut summary = Table::new([
        "app_slug",
        "installation_id",
        "last_timestamp",
        "last_hour_count",
        "today_total",
        "last_30d_total",
    ]);

    for app in apps {
        let slug = app.label().to_string();
        let installations = match app.installations_for_org(org).await {
            Ok(i) => i,
            Err(e) => {
                error!(app = %slug, error = %e, "Failed to list installations");
                continue;
            }
        };

        for installation in installations {
            let rate = match app.installation_client(installation.id).await {
                Ok((client, _token)) => client.rate_limit().await.map_err(Error::from),
                Err(e) => Err(Error::from(e)),
            };
            let core = match rate {
                Ok(r) => r.resources.core,
                Err(e) => {
                    warn!(app = %slug, installation_id = installation.id, error = %e, "Failed to sample rate limit");
                    continue;
                }
            };

            let key = format!("{slug}|{}", installation.id);
            let record = aggregates
                .entry(key)
                .or_insert_with(|| UsageRecord::new(&slug, installation.id));
            let delta = record.record_sample(core.used, core.limit, now);
            info!(app = %slug, installation_id = installation.id, delta = delta, "Sampled usage");

            summary.push_row([
                slug.clone(),
                installation.id.to_string(),
                record.last_ts.clone().unwrap_or_default(),
                delta.to_string(),
                record.today_total(now.date_naive()).to_string(),
                record.window_total().to_string(),
            ]);
        }
    }

    save_aggregates(state_file, &aggregates)?;
    if summary.is_empty() {
        info!("No installations sampled");
    } else {
        summary.write_csv(summary_csv)?;
        info!(rows = summary.len(), path = %summary_csv.display(), "Wrote usage summary");
    }
    Ok(summary)
}

/// Adds `owner/repo` to the App's installation on `owner`.
///
/// The repository id is resolved and the change made with `user_client`,
/// which must belong to an administrator of the installation account.
#[instrument(skip(app, user_client))]
pub async fn add_repository_to_installation(
    app: &dyn InstallationAuthenticator,
    user_client: &GitHubClient,
    owner: &str,
    repo: &str,
) -> Result<u64> {
    let installation = app
        .installations_for_org(owner)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            Error::InvalidInput(format!("{} is not installed on {owner}", app.label()))
        })?;

    if installation.repository_selection.as_deref() == Some("all") {
        info!(app = app.label(), "Installation already covers every repository");
        return Ok(installation.id);
    }

    let repository = user_client.get_repository(owner, repo).await?;
    user_client
        .add_repository_to_installation(installation.id, repository.id)
        .await?;
    info!(app = app.label(), repo = repo, installation_id = installation.id, "Repository added to installation");
    Ok(installation.id)
}
