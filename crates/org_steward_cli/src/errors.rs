use std::io;

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Exit code for a successful run.
pub const EXIT_OK: i32 = 0;

/// Exit code when an operation failed.
pub const EXIT_OPERATION_FAILED: i32 = 1;

/// Exit code when configuration or credentials are unusable.
pub const EXIT_CONFIGURATION: i32 = 2;

/// Errors that can occur in the org-steward CLI application.
///
/// Configuration, credential and argument problems are reported with
/// [`EXIT_CONFIGURATION`]; everything an operation itself runs into is
/// reported with [`EXIT_OPERATION_FAILED`].
#[derive(Error, Debug)]
pub enum Error {
    /// Credentials are missing, unreadable or rejected.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The configuration file cannot be read, parsed or written.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid command-line arguments were provided.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An administrative operation failed.
    #[error(transparent)]
    Operation(#[from] org_steward_core::Error),

    /// Failed to flush the standard output buffer.
    #[error("Failed to flush the std out buffer.")]
    StdOutFlushFailed,
}

impl From<auth_handler::AuthError> for Error {
    fn from(e: auth_handler::AuthError) -> Self {
        Error::Auth(e.to_string())
    }
}

impl From<github_client::Error> for Error {
    fn from(e: github_client::Error) -> Self {
        Error::Operation(e.into())
    }
}

impl From<teamcity_client::Error> for Error {
    fn from(e: teamcity_client::Error) -> Self {
        Error::Operation(e.into())
    }
}

impl Error {
    /// The process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Auth(_) | Error::Config(_) | Error::InvalidArguments(_) => EXIT_CONFIGURATION,
            Error::Operation(org_steward_core::Error::Auth(_)) => EXIT_CONFIGURATION,
            Error::Operation(org_steward_core::Error::GitHub(github_client::Error::AuthError(_))) => {
                EXIT_CONFIGURATION
            }
            Error::Operation(org_steward_core::Error::TeamCity(
                teamcity_client::Error::InvalidUrl(_),
            )) => EXIT_CONFIGURATION,
            Error::Io(_) | Error::Operation(_) | Error::StdOutFlushFailed => EXIT_OPERATION_FAILED,
        }
    }
}
