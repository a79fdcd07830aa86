use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use org_steward_cli::commands::{
    access_cmd::{self, AccessCommands},
    apps_cmd::{self, AppsCommands},
    auth_cmd::{self, AuthCommands},
    backup_cmd::{self, BackupCommands},
    config_cmd::{self, ConfigCommands},
    members_cmd::{self, MembersCommands},
    protect_cmd::{self, ProtectCommands},
    repos_cmd::{self, ReposCommands},
    secrets_cmd::{self, SecretsCommands},
    surgery_cmd::{self, SurgeryCommands},
    tables_cmd::{self, TablesCommands},
    teamcity_cmd::{self, TeamCityCommands},
    workflows_cmd::{self, WorkflowsCommands},
    Context,
};
use org_steward_cli::config::{get_config_path, AppConfig};
use org_steward_cli::errors::{Error, EXIT_OK};

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

/// Environment variable holding the log filter, e.g. `debug` or
/// `org_steward_core=debug,info`.
const LOG_ENV_VAR: &str = "ORG_STEWARD_LOG";

/// org-steward: administer a GitHub organization and its TeamCity server
#[derive(Parser, Debug)]
#[command(name = "org-steward")]
#[command(about = "Administer a GitHub organization and its TeamCity server", long_about = None)]
struct Cli {
    /// Configuration file; `./org-steward.toml` by default
    #[arg(long, global = true)]
    config: Option<String>,

    /// Organization to work on; overrides `[github] org`
    #[arg(long, global = true)]
    org: Option<String>,

    /// Concurrent requests for read-only reports; overrides `[concurrency] workers`
    #[arg(long, global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(subcommand)]
    Auth(AuthCommands),

    #[command(subcommand)]
    Config(ConfigCommands),

    /// Lockdown, inventory and inactivity of repositories
    #[command(subcommand)]
    Repos(ReposCommands),

    /// Collaborator and team access
    #[command(subcommand)]
    Access(AccessCommands),

    /// Branch protection and CODEOWNERS
    #[command(subcommand)]
    Protect(ProtectCommands),

    /// GitHub App installations
    #[command(subcommand)]
    Apps(AppsCommands),

    /// Organization members
    #[command(subcommand)]
    Members(MembersCommands),

    /// GitHub Actions usage
    #[command(subcommand)]
    Workflows(WorkflowsCommands),

    /// Hard-coded secret scan
    #[command(subcommand)]
    Secrets(SecretsCommands),

    /// Batched mirror backups
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Folder moves and dated repository snapshots
    #[command(subcommand)]
    Surgery(SurgeryCommands),

    /// Joins and filters over earlier reports
    #[command(subcommand)]
    Tables(TablesCommands),

    /// TeamCity server checks
    #[command(name = "teamcity", subcommand)]
    TeamCity(TeamCityCommands),

    /// Show the CLI version
    Version,
}

async fn run(cli: Cli) -> Result<(), Error> {
    let Cli {
        config,
        org,
        workers,
        command,
    } = cli;
    let config_path = get_config_path(config.as_deref());
    let context = || -> Result<Context, Error> {
        let config = AppConfig::load_or_default(&config_path)?;
        Ok(Context::new(config, config_path.clone(), org.clone(), workers))
    };

    match &command {
        Commands::Auth(cmd) => auth_cmd::execute(cmd, &config_path).await,
        Commands::Config(cmd) => config_cmd::execute(cmd, &config_path).await,
        Commands::Repos(cmd) => repos_cmd::execute(cmd, &context()?).await,
        Commands::Access(cmd) => access_cmd::execute(cmd, &context()?).await,
        Commands::Protect(cmd) => protect_cmd::execute(cmd, &context()?).await,
        Commands::Apps(cmd) => apps_cmd::execute(cmd, &context()?).await,
        Commands::Members(cmd) => members_cmd::execute(cmd, &context()?).await,
        Commands::Workflows(cmd) => workflows_cmd::execute(cmd, &context()?).await,
        Commands::Secrets(cmd) => secrets_cmd::execute(cmd, &context()?).await,
        Commands::Backup(cmd) => backup_cmd::execute(cmd, &context()?).await,
        Commands::Surgery(cmd) => surgery_cmd::execute(cmd, &context()?).await,
        Commands::Tables(cmd) => tables_cmd::execute(cmd, &context()?).await,
        Commands::TeamCity(cmd) => teamcity_cmd::execute(cmd, &context()?).await,
        Commands::Version => {
            println!(
                "org-steward version {}",
                option_env!("ORG_STEWARD_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
            );
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(()) => EXIT_OK,
        Err(e) => {
            error!("Error: {e}");
            eprintln!("{} {e}", "Error:".red().bold());
            e.exit_code()
        }
    };
    std::process::exit(code);
}
