//! Error type shared by every administrative operation.
//!
//! Client errors are wrapped unchanged so that their disposition survives the
//! trip up to the command line. Local failures (files, archives, git, external
//! tools) get their own variants.

use github_client::Disposition;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    GitHub(#[from] github_client::Error),

    #[error(transparent)]
    TeamCity(#[from] teamcity_client::Error),

    #[error(transparent)]
    Auth(#[from] auth_handler::AuthError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Git operation failed: {0}")]
    GitOperation(String),

    /// An input file or argument is unusable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A table is missing a column an operation reads.
    #[error("Column '{column}' not found in {source_name}")]
    MissingColumn { column: String, source_name: String },

    /// An external program exited unsuccessfully.
    #[error("'{command}' failed with exit code {code:?}: {stderr}")]
    ExternalCommand {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl Error {
    /// Classifies the error the same way [`github_client::Error::disposition`] does.
    ///
    /// Unreadable inputs and credential problems abort the run; everything
    /// local to one item (a clone, an archive, an upload) only skips that item.
    pub fn disposition(&self) -> Disposition {
        match self {
            Error::GitHub(e) => e.disposition(),
            Error::TeamCity(teamcity_client::Error::Http(_)) => Disposition::Retry,
            Error::TeamCity(teamcity_client::Error::Status { status: 401, .. }) => {
                Disposition::Abort
            }
            Error::TeamCity(teamcity_client::Error::InvalidUrl(_)) => Disposition::Abort,
            Error::TeamCity(_) => Disposition::Skip,
            Error::Auth(_) => Disposition::Abort,
            Error::InvalidInput(_) | Error::MissingColumn { .. } | Error::Csv(_) => {
                Disposition::Abort
            }
            Error::Io(_)
            | Error::Json(_)
            | Error::Zip(_)
            | Error::GitOperation(_)
            | Error::ExternalCommand { .. } => Disposition::Skip,
        }
    }
}
