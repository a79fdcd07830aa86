//! Branch protection, CODEOWNERS and protection export commands.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use colored::Colorize;
use org_steward_core::protection::{self, CodeownersChange, DEFAULT_CODEOWNERS_PATH};
use org_steward_core::{load_branch_plan, ProtectionSettings};
use tracing::{info, instrument};

use super::{output_path, split_repository, write_table, Context};
use crate::errors::Error;

#[cfg(test)]
#[path = "protect_cmd_tests.rs"]
mod tests;

/// Review rules for `protect branches`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ProtectionArgs {
    /// Approving reviews required before merging
    #[arg(long, default_value_t = 1)]
    pub approvals: u32,

    /// Apply the rules to administrators too
    #[arg(long)]
    pub enforce_admins: bool,

    /// Dismiss approvals when new commits are pushed
    #[arg(long)]
    pub dismiss_stale_reviews: bool,

    /// Do not require a review from a code owner
    #[arg(long)]
    pub no_code_owner_reviews: bool,

    /// Do not require conversations to be resolved
    #[arg(long)]
    pub no_conversation_resolution: bool,

    /// User allowed to bypass pull requests; may be repeated
    #[arg(long = "bypass-user")]
    pub bypass_users: Vec<String>,
}

impl ProtectionArgs {
    pub fn to_settings(&self) -> ProtectionSettings {
        ProtectionSettings {
            required_approvals: self.approvals,
            enforce_admins: self.enforce_admins,
            require_conversation_resolution: !self.no_conversation_resolution,
            dismiss_stale_reviews: self.dismiss_stale_reviews,
            require_code_owner_reviews: !self.no_code_owner_reviews,
            bypass_users: self.bypass_users.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ProtectCommands {
    /// Protect the branches listed in a `Repository,Branch` CSV
    Branches {
        #[arg(long)]
        plan: PathBuf,

        #[command(flatten)]
        rules: ProtectionArgs,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create or update a repository's CODEOWNERS file
    Codeowners {
        /// `repo` or `owner/repo`
        #[arg(long)]
        repo: String,

        /// Owners, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        owners: Vec<String>,

        /// Defaults to the repository's default branch
        #[arg(long)]
        branch: Option<String>,

        #[arg(long, default_value = DEFAULT_CODEOWNERS_PATH)]
        path: String,
    },

    /// Export the protection of one branch as JSON
    Export {
        #[arg(long)]
        repo: String,

        #[arg(long)]
        branch: String,

        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Export every organization ruleset as JSON
    Rulesets {
        #[arg(short, long, default_value = "rulesets")]
        output: PathBuf,
    },
}

#[instrument(skip(ctx))]
pub async fn execute(cmd: &ProtectCommands, ctx: &Context) -> Result<(), Error> {
    let org = ctx.org()?;
    match cmd {
        ProtectCommands::Branches {
            plan,
            rules,
            output,
        } => {
            let plan = load_branch_plan(plan)?;
            let session = ctx.session().await?;
            let outcomes =
                protection::protect_branches(&session.client, org, &plan, &rules.to_settings())
                    .await?;
            let failed = outcomes.iter().filter(|o| !o.ok).count();
            for o in &outcomes {
                let mark = if o.ok { "OK".green() } else { "FAILED".red() };
                println!("{mark} {}:{} {}", o.repo, o.branch, o.message);
            }
            println!("{} of {} branches protected", outcomes.len() - failed, outcomes.len());
            write_table(
                &protection::outcomes_table(&outcomes),
                &output_path(output.clone(), "branch_protection", "csv"),
            )
        }
        ProtectCommands::Codeowners {
            repo,
            owners,
            branch,
            path,
        } => {
            let (owner, repo) = split_repository(repo, org);
            let session = ctx.session().await?;
            let branch = match branch {
                Some(branch) => branch.clone(),
                None => session
                    .client
                    .get_repository(owner, repo)
                    .await?
                    .default_branch
                    .ok_or_else(|| {
                        Error::InvalidArguments(format!(
                            "{owner}/{repo} has no default branch; pass --branch"
                        ))
                    })?,
            };
            info!(repo = repo, branch = %branch, "Writing CODEOWNERS");
            let change =
                protection::ensure_codeowners(&session.client, owner, repo, &branch, owners, path)
                    .await?;
            let message = match change {
                CodeownersChange::Created => "created".green(),
                CodeownersChange::Updated => "updated".green(),
                CodeownersChange::Unchanged => "already up to date".normal(),
            };
            println!("{path} on {owner}/{repo}@{branch} {message}");
            Ok(())
        }
        ProtectCommands::Export {
            repo,
            branch,
            output,
        } => {
            let (owner, repo) = split_repository(repo, org);
            let session = ctx.session().await?;
            match protection::export_branch_protection(&session.client, owner, repo, branch, output)
                .await?
            {
                Some(path) => println!("Wrote {}", path.display()),
                None => println!("{}", format!("{repo}:{branch} is not protected").yellow()),
            }
            Ok(())
        }
        ProtectCommands::Rulesets { output } => {
            let session = ctx.session().await?;
            let written = protection::export_rulesets(&session.client, org, output).await?;
            println!("Wrote {} rulesets to {}", written.len(), output.display());
            Ok(())
        }
    }
}
