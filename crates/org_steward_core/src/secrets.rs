//! Scans repository contents for credentials committed in plain text.
//!
//! Only the default branch is read, through the git tree and blob APIs. Each
//! file is reported once, under the first pattern it matches. Specific
//! patterns are tried before the generic `key = value` ones so that the
//! report names the most precise match.

use futures::stream::{self, StreamExt};
use github_client::{Disposition, GitHubClient, Repository};
use regex::Regex;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::{Error, Result};
use crate::report::Table;

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod tests;

pub const SECRET_COLUMNS: [&str; 3] = ["Repository", "File", "Pattern"];

/// Blobs larger than this are not downloaded.
pub const MAX_BLOB_SIZE: u64 = 1024 * 1024;

const BUILTIN_PATTERNS: &[(&str, &str)] = &[
    ("GitHub token", r"ghp_[A-Za-z0-9]{36}"),
    ("Stripe secret key", r"sk_live_[0-9a-zA-Z]{24}"),
    ("Google API key", r"AIza[0-9A-Za-z_-]{35}"),
    ("Facebook access token", r"EAACEdEose0cBA[0-9A-Za-z]+"),
    (
        "Azure subscription key",
        r#"AZURE_SUBSCRIPTION_KEY[=: ]+['"]?[0-9a-f]{32}['"]?"#,
    ),
    (
        "Azure storage key",
        r#"(?:AccountKey=|azure_storage_key=|AZURE_STORAGE_KEY[=: ]+)['"]?[A-Za-z0-9+/=]{88}['"]?"#,
    ),
    (
        "Azure SAS token",
        r"sv=[0-9]{4}-[0-9]{2}-[0-9]{2}&ss=[a-z]+&srt=[a-z]+&sp=[a-z]+&se=[0-9]+T[0-9]+Z&st=[0-9]+T[0-9]+Z&spr=https&sig=[a-zA-Z0-9%]+",
    ),
    (
        "Azure client secret",
        r#"(AZURE|azure|AAD|aad|CLIENT|client)_?(SECRET|secret)[=: ]+['"]?[A-Za-z0-9/+=-]{16,}['"]?"#,
    ),
    ("Azure key", r"AI[a-zA-Z0-9]{32,}"),
    (
        "AWS secret",
        r#"(AWS|aws)_?(SECRET|secret|ACCESS|access|KEY|key)[=: ]+['"]?[A-Za-z0-9/+=]{16,}"#,
    ),
    (
        "Generic API key",
        r#"(API|api|CLIENT|client|SECRET|secret|TOKEN|token|KEY|key)[=: ]+['"]?[A-Za-z0-9/+=-]{16,}"#,
    ),
    (
        "Password",
        r#"(PASSWORD|password|PASS|pass|PWD|pwd)[=: ]+['"]?[A-Za-z0-9/+=]{8,}"#,
    ),
];

/// A named set of compiled secret patterns.
#[derive(Clone, Debug)]
pub struct SecretScanner {
    patterns: Vec<(String, Regex)>,
}

impl SecretScanner {
    /// The built-in patterns: AWS, Azure, GitHub, Google, Facebook and Stripe
    /// credentials plus generic keys and passwords.
    pub fn builtin() -> Result<Self> {
        Self::with_patterns(BUILTIN_PATTERNS.iter().copied())
    }

    /// Compiles `(name, regex)` pairs, kept in the given order.
    pub fn with_patterns<'a, I>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let patterns = patterns
            .into_iter()
            .map(|(name, pattern)| {
                Regex::new(pattern)
                    .map(|re| (name.to_string(), re))
                    .map_err(|e| Error::InvalidInput(format!("bad secret pattern '{name}': {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Name of the first pattern found in `text`.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(name, _)| name.as_str())
    }
}

/// `(file path, pattern name)` for every file of the default branch of
/// `repo` that matches a pattern.
///
/// Files that cannot be read or are binary are skipped.
pub async fn scan_repository(
    client: &GitHubClient,
    org: &str,
    repo: &Repository,
    scanner: &SecretScanner,
) -> Result<Vec<(String, String)>> {
    let Some(branch) = repo.default_branch.as_deref() else {
        warn!(repo = %repo.name, "Repository has no default branch, nothing to scan");
        return Ok(Vec::new());
    };
    let tree = client.get_tree_recursive(org, &repo.name, branch).await?;

    let mut findings = Vec::new();
    for entry in tree.tree.iter().filter(|e| e.is_blob()) {
        if entry.size.is_some_and(|s| s > MAX_BLOB_SIZE) {
            debug!(file = %entry.path, "Skipping large file");
            continue;
        }
        let text = match client.get_blob_text(org, &repo.name, &entry.sha).await {
            Ok(Some(text)) => text,
            Ok(None) => continue,
            Err(e) if e.disposition() == Disposition::Abort => return Err(e.into()),
            Err(e) => {
                debug!(file = %entry.path, error = %e, "Could not read file");
                continue;
            }
        };
        if let Some(pattern) = scanner.first_match(&text) {
            warn!(repo = %repo.name, file = %entry.path, pattern = pattern, "Possible secret found");
            findings.push((entry.path.clone(), pattern.to_string()));
        }
    }
    Ok(findings)
}

/// Scans `repos` and reports one row per suspicious file.
#[instrument(skip(client, repos, scanner), fields(repos = repos.len()))]
pub async fn scan_repositories(
    client: &GitHubClient,
    org: &str,
    repos: &[Repository],
    scanner: &SecretScanner,
    workers: usize,
) -> Result<Table> {
    let results: Vec<_> = stream::iter(repos)
        .map(|repo| async move {
            info!(repo = %repo.name, "Scanning");
            (repo, scan_repository(client, org, repo, scanner).await)
        })
        .buffered(workers.max(1))
        .collect()
        .await;

    let mut table = Table::new(SECRET_COLUMNS);
    for (repo, result) in results {
        match result {
            Ok(findings) => {
                for (file, pattern) in findings {
                    table.push_row([repo.name.clone(), file, pattern]);
                }
            }
            Err(e) if e.disposition() == Disposition::Abort => return Err(e),
            Err(e) => error!(repo = %repo.name, error = %e, "Skipping repository"),
        }
    }
    info!(findings = table.len(), "Secret scan complete");
    Ok(table)
}

/// The items between `start` (inclusive) and `end` (exclusive),
/// clamped to the list.
pub fn index_range<T>(items: &[T], start: usize, end: usize) -> &[T] {
    let end = end.min(items.len());
    let start = start.min(end);
    &items[start..end]
}
