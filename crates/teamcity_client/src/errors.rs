//! Error types for TeamCity client operations.

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur while talking to TeamCity or reading plugin metadata.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configured server URL cannot be parsed.
    #[error("Invalid TeamCity URL '{0}'")]
    InvalidUrl(String),

    /// The HTTP request failed before a response arrived, or the client could
    /// not be built.
    #[error("HTTP request to TeamCity failed: {0}")]
    Http(#[from] reqwest::Error),

    /// TeamCity answered with a non-success status.
    #[error("TeamCity returned {status} for {endpoint}")]
    Status { status: u16, endpoint: String },

    /// The response body did not have the expected shape.
    #[error("Unexpected TeamCity response: {0}")]
    InvalidResponse(String),

    /// A plugin directory could not be read.
    #[error("Failed to read plugin directory {path}: {source}")]
    PluginDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
