//! Input lists read from files.
//!
//! Most mutating operations work on a list of repositories. The list is either
//! a plain text file (one name per line, `#` starts a comment) or a CSV file
//! whose first column holds the names under a header row.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::errors::{Error, Result};
use crate::report::Table;

#[cfg(test)]
#[path = "input_tests.rs"]
mod tests;

/// Column read by [`load_branch_plan`].
pub const REPOSITORY_COLUMN: &str = "Repository";

/// Column read by [`load_branch_plan`]; several branches may be separated by `;`.
pub const BRANCH_COLUMN: &str = "Branch";

/// Normalises one list entry: trims it, drops comments and blank lines, and
/// strips an `owner/` prefix or a trailing `.git`.
pub fn normalize_repo_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_matches('"').trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let name = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let name = name.strip_suffix(".git").unwrap_or(name).trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Normalises and de-duplicates entries, keeping the first occurrence.
pub fn parse_repo_list<'a, I>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter_map(normalize_repo_name)
        .filter(|name| seen.insert(name.to_ascii_lowercase()))
        .collect()
}

/// Loads a repository list from a text or CSV file.
///
/// # Errors
/// Fails when the file cannot be read or contains no repository names.
pub fn load_repo_list(path: &Path) -> Result<Vec<String>> {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let repos = if is_csv {
        let table = Table::read_csv(path)?;
        parse_repo_list(
            table
                .rows()
                .iter()
                .filter_map(|row| row.first().map(String::as_str)),
        )
    } else {
        let text = fs::read_to_string(path)?;
        parse_repo_list(text.lines())
    };

    if repos.is_empty() {
        return Err(Error::InvalidInput(format!(
            "no repository names found in {}",
            path.display()
        )));
    }
    info!(path = %path.display(), count = repos.len(), "Loaded repository list");
    Ok(repos)
}

/// Loads a `repository -> branches` plan from a CSV file with
/// [`REPOSITORY_COLUMN`] and [`BRANCH_COLUMN`].
pub fn load_branch_plan(path: &Path) -> Result<BTreeMap<String, Vec<String>>> {
    let table = Table::read_csv(path)?;
    let source = path.display().to_string();
    let repo_index = table.require_column(REPOSITORY_COLUMN, &source)?;
    let branch_index = table.require_column(BRANCH_COLUMN, &source)?;

    let mut plan: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in table.rows() {
        let Some(repo) = normalize_repo_name(&row[repo_index]) else {
            continue;
        };
        let branches: Vec<String> = row[branch_index]
            .split(';')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string)
            .collect();
        if branches.is_empty() {
            warn!(repo = %repo, "No branches listed for repository");
            continue;
        }
        let entry = plan.entry(repo).or_default();
        for branch in branches {
            if !entry.contains(&branch) {
                entry.push(branch);
            }
        }
    }

    if plan.is_empty() {
        return Err(Error::InvalidInput(format!(
            "no repository/branch pairs found in {source}"
        )));
    }
    Ok(plan)
}
