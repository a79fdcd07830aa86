//! Joins and filters over previously written reports.
//!
//! These operations only read and write tables. The single network input,
//! TeamCity VCS roots, is passed in already fetched.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use teamcity_client::VcsRoot;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::report::{Table, Workbook};

#[cfg(test)]
#[path = "tables_tests.rs"]
mod tests;

/// Column added by [`map_repositories_to_apps`].
pub const APP_COLUMN: &str = "GitHub App";

/// Repository column of the inactive repository report.
pub const REPOSITORY_COLUMN: &str = "Repository";

/// Column names tried, in order, when reading an App installation sheet.
pub const APP_SHEET_REPOSITORY_COLUMNS: [&str; 3] =
    ["Repository Name", "RepositoryName", "Repository"];

pub const VCS_COLUMNS: [&str; 4] = ["Repository", "VCS Root ID", "VCS Root Name", "VCS URL"];

const APP_COLUMN_POSITION: usize = 3;

/// Maps repository names (without owner) to the `; `-joined, sorted names of
/// the App sheets that list them.
pub fn repository_app_map(apps: &Workbook) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();

    for (sheet, table) in apps.sheets() {
        let Some(column) = APP_SHEET_REPOSITORY_COLUMNS
            .iter()
            .find_map(|c| table.column_index(c))
        else {
            warn!(sheet = %sheet, "No repository column in sheet, skipping");
            continue;
        };
        for row in table.rows() {
            let full_name = row[column].trim();
            let name = full_name
                .split_once('/')
                .map_or(full_name, |(_, repo)| repo)
                .trim();
            if !name.is_empty() {
                map.entry(name.to_string()).or_default().insert(sheet.as_str());
            }
        }
    }

    map.into_iter()
        .map(|(repo, sheets)| (repo, sheets.into_iter().collect::<Vec<_>>().join("; ")))
        .collect()
}

/// Copies `inactive` with a [`APP_COLUMN`] inserted as fourth column, naming
/// the App installations that can reach each repository.
pub fn map_repositories_to_apps(apps: &Workbook, inactive: &Table) -> Result<Table> {
    let column = inactive.require_column(REPOSITORY_COLUMN, "inactive repository report")?;
    let map = repository_app_map(apps);
    info!(repos = map.len(), "Repositories reachable by GitHub Apps");

    let values = inactive
        .rows()
        .iter()
        .map(|row| map.get(row[column].trim()).cloned().unwrap_or_default())
        .collect();
    let mut mapped = inactive.clone();
    mapped.insert_column(APP_COLUMN_POSITION, APP_COLUMN, values);
    Ok(mapped)
}

/// Removes from every sheet of `workbook` the rows whose `column` value
/// appears in the same column of `exclude`, ignoring case and surrounding
/// whitespace.
pub fn subtract(workbook: &Workbook, exclude: &Table, column: &str) -> Result<Workbook> {
    let index = exclude.require_column(column, "exclusion list")?;
    let excluded: HashSet<String> = exclude
        .rows()
        .iter()
        .map(|r| r[index].trim().to_lowercase())
        .collect();

    let mut result = Workbook::new();
    for (sheet, table) in workbook.sheets() {
        let index = table.require_column(column, sheet)?;
        let mut kept = table.clone();
        kept.retain_rows(|row| !excluded.contains(&row[index].trim().to_lowercase()));
        debug!(sheet = %sheet, removed = table.len() - kept.len(), "Subtracted rows");
        result.add_sheet(sheet, kept);
    }
    Ok(result)
}

/// Keeps the rows of `table` whose `column` value is in `keep`, ignoring case
/// and surrounding whitespace.
pub fn select(table: &Table, keep: &[String], column: &str) -> Result<Table> {
    let index = table.require_column(column, "report")?;
    let keep: HashSet<String> = keep.iter().map(|k| k.trim().to_lowercase()).collect();
    let mut selected = table.clone();
    selected.retain_rows(|row| keep.contains(&row[index].trim().to_lowercase()));
    info!(kept = selected.len(), of = table.len(), "Selected rows");
    Ok(selected)
}

/// Lists the TeamCity VCS roots pointing at repositories that some GitHub App
/// can reach.
///
/// Only rows of `mapped` with a non-empty [`APP_COLUMN`] are considered. A
/// root matches a repository when its URL contains `/<repository>`, compared
/// in lower case. Roots without a URL never match.
pub fn map_vcs_roots(mapped: &Table, roots: &[VcsRoot]) -> Result<Table> {
    let repo_column = mapped.require_column(REPOSITORY_COLUMN, "app mapping report")?;
    let app_column = mapped.require_column(APP_COLUMN, "app mapping report")?;

    let targets: BTreeSet<&str> = mapped
        .rows()
        .iter()
        .filter(|row| !row[app_column].trim().is_empty())
        .map(|row| row[repo_column].trim())
        .filter(|repo| !repo.is_empty())
        .collect();
    info!(repos = targets.len(), roots = roots.len(), "Matching VCS roots");

    let mut table = Table::new(VCS_COLUMNS);
    for repo in targets {
        let needle = format!("/{}", repo.to_lowercase());
        for root in roots.iter().filter(|r| !r.url.is_empty()) {
            if root.url.to_lowercase().contains(&needle) {
                table.push_row([repo, root.id.as_str(), root.name.as_str(), root.url.as_str()]);
            }
        }
    }
    Ok(table)
}
