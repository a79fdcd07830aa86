//! Branch protection, CODEOWNERS files and protection/ruleset exports.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use github_client::{
    Branch, BranchProtectionRequest, BypassAllowances, Disposition, FileUpdate, GitHubClient,
    PullRequestReviewRules,
};
use tracing::{error, info, instrument, warn};

use crate::errors::{Error, Result};
use crate::report::Table;

#[cfg(test)]
#[path = "protection_tests.rs"]
mod tests;

pub const DEFAULT_CODEOWNERS_PATH: &str = ".github/CODEOWNERS";

/// Review rules applied to every protected branch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtectionSettings {
    pub required_approvals: u32,
    pub enforce_admins: bool,
    pub require_conversation_resolution: bool,
    pub dismiss_stale_reviews: bool,
    pub require_code_owner_reviews: bool,
    /// Users allowed to bypass the pull request requirement
    pub bypass_users: Vec<String>,
}

impl Default for ProtectionSettings {
    fn default() -> Self {
        Self {
            required_approvals: 1,
            enforce_admins: false,
            require_conversation_resolution: true,
            dismiss_stale_reviews: false,
            require_code_owner_reviews: true,
            bypass_users: Vec::new(),
        }
    }
}

impl ProtectionSettings {
    /// Builds the REST payload. Status checks, push restrictions, force pushes
    /// and deletions are left off.
    pub fn to_request(&self) -> BranchProtectionRequest {
        let bypass = if self.bypass_users.is_empty() {
            None
        } else {
            Some(BypassAllowances {
                users: self
                    .bypass_users
                    .iter()
                    .map(|u| u.trim_start_matches('@').to_string())
                    .collect(),
                ..Default::default()
            })
        };
        BranchProtectionRequest {
            enforce_admins: self.enforce_admins,
            required_pull_request_reviews: Some(PullRequestReviewRules {
                dismiss_stale_reviews: self.dismiss_stale_reviews,
                require_code_owner_reviews: self.require_code_owner_reviews,
                required_approving_review_count: self.required_approvals,
                bypass_pull_request_allowances: bypass,
            }),
            required_conversation_resolution: self.require_conversation_resolution,
            ..Default::default()
        }
    }
}

/// Finds the branch matching `wanted`, preferring an exact match over a
/// case-insensitive one.
pub fn resolve_branch<'a>(branches: &'a [Branch], wanted: &str) -> Option<&'a str> {
    branches
        .iter()
        .find(|b| b.name == wanted)
        .or_else(|| branches.iter().find(|b| b.name.eq_ignore_ascii_case(wanted)))
        .map(|b| b.name.as_str())
}

/// Result of protecting one branch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchOutcome {
    pub repo: String,
    /// The branch name as it exists in the repository, or as requested when
    /// it could not be found
    pub branch: String,
    pub ok: bool,
    pub message: String,
}

pub fn outcomes_table(outcomes: &[BranchOutcome]) -> Table {
    let mut table = Table::new(["Repository", "Branch", "Result", "Message"]);
    for o in outcomes {
        table.push_row([
            o.repo.clone(),
            o.branch.clone(),
            if o.ok { "OK" } else { "FAILED" }.to_string(),
            o.message.clone(),
        ]);
    }
    table
}

/// Applies `settings` to every `repository -> branches` entry of `plan`.
///
/// Branch names are resolved against the repository's branches ignoring case.
/// Failures are recorded per branch and do not stop the run.
#[instrument(skip(client, plan, settings), fields(repos = plan.len()))]
pub async fn protect_branches(
    client: &GitHubClient,
    org: &str,
    plan: &BTreeMap<String, Vec<String>>,
    settings: &ProtectionSettings,
) -> Result<Vec<BranchOutcome>> {
    let request = settings.to_request();
    let mut outcomes = Vec::new();

    for (repo, wanted_branches) in plan {
        let branches = match client.list_branches(org, repo).await {
            Ok(b) => b,
            Err(e) if e.disposition() == Disposition::Abort => return Err(e.into()),
            Err(e) => {
                error!(repo = %repo, error = %e, "Failed to list branches");
                for wanted in wanted_branches {
                    outcomes.push(BranchOutcome {
                        repo: repo.clone(),
                        branch: wanted.clone(),
                        ok: false,
                        message: e.to_string(),
                    });
                }
                continue;
            }
        };

        for wanted in wanted_branches {
            let Some(branch) = resolve_branch(&branches, wanted) else {
                warn!(repo = %repo, branch = %wanted, "Branch not found");
                outcomes.push(BranchOutcome {
                    repo: repo.clone(),
                    branch: wanted.clone(),
                    ok: false,
                    message: "branch not found".to_string(),
                });
                continue;
            };

            match client
                .put_branch_protection(org, repo, branch, &request)
                .await
            {
                Ok(()) => {
                    info!(repo = %repo, branch = branch, "Protection set");
                    outcomes.push(BranchOutcome {
                        repo: repo.clone(),
                        branch: branch.to_string(),
                        ok: true,
                        message: "protected".to_string(),
                    });
                }
                Err(e) if e.disposition() == Disposition::Abort => return Err(e.into()),
                Err(e) => {
                    error!(repo = %repo, branch = branch, error = %e, "Failed to set protection");
                    outcomes.push(BranchOutcome {
                        repo: repo.clone(),
                        branch: branch.to_string(),
                        ok: false,
                        message: e.to_string(),
                    });
                }
            }
        }
    }
    Ok(outcomes)
}

/// Renders a CODEOWNERS file assigning every path to `owners`.
///
/// Owners without a leading `@` get one; blank entries are dropped.
pub fn render_codeowners(owners: &[String]) -> Result<String> {
    let owners: Vec<String> = owners
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .map(|o| {
            if o.starts_with('@') {
                o.to_string()
            } else {
                format!("@{o}")
            }
        })
        .collect();
    if owners.is_empty() {
        return Err(Error::InvalidInput(
            "at least one code owner is required".to_string(),
        ));
    }
    Ok(format!("* {}\n", owners.join(" ")))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeownersChange {
    Created,
    Updated,
    Unchanged,
}

/// Creates or updates the CODEOWNERS file on `branch`.
#[instrument(skip(client, owners))]
pub async fn ensure_codeowners(
    client: &GitHubClient,
    org: &str,
    repo: &str,
    branch: &str,
    owners: &[String],
    path: &str,
) -> Result<CodeownersChange> {
    let content = render_codeowners(owners)?;
    let existing = client.get_file(org, repo, path, Some(branch)).await?;

    let (sha, change) = match existing {
        Some(file) => {
            if file.decoded().is_ok_and(|current| current == content) {
                info!(repo = repo, branch = branch, "CODEOWNERS already up to date");
                return Ok(CodeownersChange::Unchanged);
            }
            (Some(file.sha), CodeownersChange::Updated)
        }
        None => (None, CodeownersChange::Created),
    };

    let update = FileUpdate::new(
        format!("Add/Update CODEOWNERS for {branch}"),
        &content,
        Some(branch.to_string()),
        sha,
    );
    client.put_file(org, repo, path, &update).await?;
    info!(repo = repo, branch = branch, change = ?change, "CODEOWNERS written");
    Ok(change)
}

/// Writes the protection of one branch as pretty-printed JSON to
/// `<out_dir>/<repo>_<branch>_protection.json`.
///
/// Returns `None` when the branch is not protected.
#[instrument(skip(client))]
pub async fn export_branch_protection(
    client: &GitHubClient,
    org: &str,
    repo: &str,
    branch: &str,
    out_dir: &Path,
) -> Result<Option<PathBuf>> {
    let Some(protection) = client.get_branch_protection(org, repo, branch).await? else {
        warn!(repo = repo, branch = branch, "Branch is not protected or does not exist");
        return Ok(None);
    };
    fs::create_dir_all(out_dir)?;
    let file_name = format!("{repo}_{}_protection.json", branch.replace('/', "_"));
    let path = out_dir.join(file_name);
    fs::write(&path, serde_json::to_string_pretty(&protection)?)?;
    info!(path = %path.display(), "Exported branch protection");
    Ok(Some(path))
}

/// Writes every organization ruleset to `<out_dir>/ruleset_<id>.json`.
///
/// A ruleset that cannot be read is logged and skipped.
#[instrument(skip(client))]
pub async fn export_rulesets(
    client: &GitHubClient,
    org: &str,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let rulesets = client.list_org_rulesets(org).await?;
    fs::create_dir_all(out_dir)?;

    let mut written = Vec::new();
    for summary in rulesets {
        match client.get_org_ruleset(org, summary.id).await {
            Ok(ruleset) => {
                let path = out_dir.join(format!("ruleset_{}.json", summary.id));
                fs::write(&path, serde_json::to_string_pretty(&ruleset)?)?;
                info!(id = summary.id, name = %summary.name, "Exported ruleset");
                written.push(path);
            }
            Err(e) if e.disposition() == Disposition::Abort => return Err(e.into()),
            Err(e) => error!(id = summary.id, error = %e, "Failed to read ruleset"),
        }
    }
    Ok(written)
}
