use std::path::Path;

use clap::Subcommand;
use tracing::{debug, error, info, instrument};

use crate::config::AppConfig;
use crate::errors::Error;

#[cfg(test)]
#[path = "config_cmd_tests.rs"]
mod tests;

/// Subcommands for the config command
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Create initial configuration file
    Init,

    /// Show the effective configuration
    Show,
}

/// Execute the config command
#[instrument]
pub async fn execute(cmd: &ConfigCommands, config_path: &Path) -> Result<(), Error> {
    match cmd {
        ConfigCommands::Init => init_config(config_path),
        ConfigCommands::Show => {
            print!("{}", show_config(config_path)?);
            Ok(())
        }
    }
}

/// Initialize a new configuration file
fn init_config(config_path: &Path) -> Result<(), Error> {
    debug!(message = "Initializing configuration", path = ?config_path);

    if config_path.exists() {
        let err = Error::Config(format!(
            "Configuration file already exists at {:?}",
            config_path
        ));
        error!(
            message = "Configuration file already exists",
            path = ?config_path,
            error = ?err
        );
        return Err(err);
    }

    AppConfig::default().save(config_path)?;
    info!(message = "Configuration initialized", path = ?config_path);
    println!("Configuration initialized at {:?}", config_path);
    Ok(())
}

/// The configuration in effect, as TOML.
fn show_config(config_path: &Path) -> Result<String, Error> {
    let config = AppConfig::load_or_default(config_path)?;
    toml::to_string_pretty(&config)
        .map_err(|e| Error::Config(format!("Failed to serialize configuration: {}", e)))
}
