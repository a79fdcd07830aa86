//! TeamCity upgrade readiness and token permission reports.

use std::path::Path;

use teamcity_client::{compatibility, scan_plugin_dir, TeamCityClient, PERMISSION_ENDPOINTS};
use tracing::{info, instrument, warn};

use crate::errors::Result;
use crate::report::Table;

#[cfg(test)]
#[path = "teamcity_tests.rs"]
mod tests;

pub const PLUGIN_COLUMNS: [&str; 5] = [
    "Plugin Name",
    "Vendor",
    "Compatible Versions",
    "Path",
    "Compatible with Target Version?",
];

pub const INSTALLED_PLUGIN_COLUMN: &str = "Plugin";

pub const PERMISSION_COLUMNS: [&str; 3] = ["Permission", "Endpoint", "Result"];

const UNKNOWN_VERSION: &str = "Unknown";

/// Output of [`plugin_compatibility_report`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginReport {
    /// Version reported by the server, `Unknown` when it could not be read
    pub current_version: String,
    /// One row per plugin with a descriptor
    pub plugins: Table,
    /// Every directory or `.zip` entry TeamCity would load
    pub installed: Table,
}

/// Checks every plugin in `plugin_dir` against `target_version`.
///
/// The server is only asked for its current version; without a client, or
/// when the call fails, the version is reported as `Unknown`.
#[instrument(skip(client))]
pub async fn plugin_compatibility_report(
    client: Option<&TeamCityClient>,
    plugin_dir: &Path,
    target_version: &str,
) -> Result<PluginReport> {
    let current_version = match client {
        Some(client) => match client.server_version().await {
            Ok(version) => version,
            Err(e) => {
                warn!(error = %e, "Could not read TeamCity version");
                UNKNOWN_VERSION.to_string()
            }
        },
        None => UNKNOWN_VERSION.to_string(),
    };
    info!(current = %current_version, target = target_version, "Checking plugin compatibility");

    let scan = scan_plugin_dir(plugin_dir)?;
    let mut plugins = Table::new(PLUGIN_COLUMNS);
    for plugin in &scan.descriptors {
        let verdict = compatibility(&plugin.compatible_versions, target_version);
        plugins.push_row([
            plugin.name.clone(),
            plugin.vendor.clone(),
            plugin.compatible_versions.clone(),
            plugin.path.display().to_string(),
            verdict.to_string(),
        ]);
    }

    let mut installed = Table::new([INSTALLED_PLUGIN_COLUMN]);
    for name in scan.installed {
        installed.push_row([name]);
    }

    Ok(PluginReport {
        current_version,
        plugins,
        installed,
    })
}

/// Probes the standard endpoints and reports what the token may read.
#[instrument(skip(client))]
pub async fn token_permission_report(client: &TeamCityClient) -> Table {
    let mut table = Table::new(PERMISSION_COLUMNS);
    for (name, endpoint) in PERMISSION_ENDPOINTS {
        let outcome = client.probe(endpoint).await;
        info!(permission = name, outcome = %outcome, "Probed endpoint");
        table.push_row([name.to_string(), endpoint.to_string(), outcome.to_string()]);
    }
    table
}
