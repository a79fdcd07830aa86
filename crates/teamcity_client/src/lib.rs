//! Crate for interacting with the TeamCity REST API.
//!
//! Covers the read-only calls the administrative reports need: server version,
//! VCS roots and permission probing with a personal access token. Plugin
//! metadata is read from the server's plugin directories by [`plugins`].

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub mod errors;
pub use errors::Error;

pub mod plugins;
pub use plugins::{compatibility, scan_plugin_dir, Compatibility, PluginDescriptor, PluginScan};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Endpoints probed to find out what a token may read, with display names.
pub const PERMISSION_ENDPOINTS: [(&str, &str); 6] = [
    ("User Info", "/app/rest/users/current"),
    ("Projects", "/app/rest/projects"),
    ("Plugins", "/app/rest/server/plugins"),
    ("Build Types", "/app/rest/buildTypes"),
    ("Agents", "/app/rest/agents"),
    ("Server Info", "/app/rest/server"),
];

/// A VCS root with its repository URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VcsRoot {
    pub id: String,
    pub name: String,
    /// Value of the `url` property; empty when the root has none
    pub url: String,
}

/// Result of probing one endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    Granted,
    Forbidden,
    Unauthorized,
    Unexpected(u16),
    Failed(String),
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Granted => write!(f, "Access granted"),
            ProbeOutcome::Forbidden => write!(f, "Access denied (403 Forbidden)"),
            ProbeOutcome::Unauthorized => write!(f, "Unauthorized (401 Unauthorized)"),
            ProbeOutcome::Unexpected(status) => write!(f, "Unexpected response ({status})"),
            ProbeOutcome::Failed(message) => write!(f, "Error: {message}"),
        }
    }
}

#[derive(Deserialize)]
struct ServerInfo {
    version: String,
}

/// A client for one TeamCity server, authenticated with a bearer token.
pub struct TeamCityClient {
    http: reqwest::Client,
    base_url: String,
    token: SecretString,
}

impl TeamCityClient {
    /// Creates a client.
    ///
    /// `accept_invalid_certs` disables TLS certificate validation for servers
    /// with self-signed certificates.
    pub fn new(
        base_url: &str,
        token: SecretString,
        accept_invalid_certs: bool,
    ) -> Result<Self, Error> {
        Url::parse(base_url).map_err(|_| Error::InvalidUrl(base_url.to_string()))?;
        if accept_invalid_certs {
            warn!(url = base_url, "TLS certificate validation is disabled for TeamCity");
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("org-steward/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn get(&self, endpoint: &str) -> Result<reqwest::Response, Error> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(url = %url, "Calling TeamCity");
        let response = self
            .http
            .get(&url)
            .bearer_auth(self.token.expose_secret())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        Ok(response)
    }

    async fn get_json(&self, endpoint: &str) -> Result<Value, Error> {
        let response = self.get(endpoint).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            });
        }
        Ok(response.json().await?)
    }

    /// Reads the server version string, e.g. `2023.11.1 (build 147412)`.
    #[instrument(skip(self))]
    pub async fn server_version(&self) -> Result<String, Error> {
        let value = self.get_json("/app/rest/server").await?;
        let info: ServerInfo = serde_json::from_value(value)
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;
        info!(version = %info.version, "Read TeamCity server version");
        Ok(info.version)
    }

    /// Lists every VCS root with its `url` property in a single call.
    #[instrument(skip(self))]
    pub async fn list_vcs_roots(&self) -> Result<Vec<VcsRoot>, Error> {
        let value = self
            .get_json("/app/rest/vcs-roots?fields=vcs-root(id,name,properties(property(name,value)))")
            .await?;
        let roots = parse_vcs_roots(&value);
        info!(count = roots.len(), "Fetched TeamCity VCS roots");
        Ok(roots)
    }

    /// Requests `endpoint` and classifies the answer. Never fails; transport
    /// errors become [`ProbeOutcome::Failed`].
    #[instrument(skip(self))]
    pub async fn probe(&self, endpoint: &str) -> ProbeOutcome {
        match self.get(endpoint).await {
            Ok(response) => match response.status().as_u16() {
                200 => ProbeOutcome::Granted,
                401 => ProbeOutcome::Unauthorized,
                403 => ProbeOutcome::Forbidden,
                other => ProbeOutcome::Unexpected(other),
            },
            Err(e) => ProbeOutcome::Failed(e.to_string()),
        }
    }
}

/// Extracts VCS roots from the listing payload.
///
/// TeamCity names the array `vcs-root` or `vcsRoot` depending on the version.
fn parse_vcs_roots(value: &Value) -> Vec<VcsRoot> {
    let raw = value
        .get("vcs-root")
        .or_else(|| value.get("vcsRoot"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    raw.iter()
        .map(|root| {
            let url = root
                .pointer("/properties/property")
                .and_then(Value::as_array)
                .and_then(|props| {
                    props
                        .iter()
                        .find(|p| p.get("name").and_then(Value::as_str) == Some("url"))
                })
                .and_then(|p| p.get("value").and_then(Value::as_str))
                .unwrap_or_default()
                .to_string();

            VcsRoot {
                id: root
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                name: root
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                url,
            }
        })
        .collect()
}
