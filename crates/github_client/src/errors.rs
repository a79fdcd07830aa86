//! Error types for GitHub client operations.
//!
//! Every failure the client surfaces carries enough context to decide what the
//! caller should do next: retry the request, skip the item being processed, or
//! abort the whole run. See [`Error::disposition`].

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// What a caller should do with a failed operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Transient failure. Retrying after a delay may succeed.
    Retry,

    /// Permanent failure for the current item. Record it and move on.
    Skip,

    /// Fatal failure. Continuing the run would only repeat the failure.
    Abort,
}

/// Errors that can occur during GitHub client operations.
///
/// ## Examples
///
/// ```rust,ignore
/// use github_client::{Disposition, Error};
///
/// match client.get_repository("my-org", "my-repo").await {
///     Ok(repo) => println!("{}", repo.full_name),
///     Err(e) if e.disposition() == Disposition::Abort => return Err(e),
///     Err(e) => eprintln!("skipping my-repo: {e}"),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The GitHub API rejected the request with a non-success status.
    ///
    /// This covers permanent client errors such as 403 (without an exhausted
    /// rate limit), 409 and 422. The message is the `message` field of GitHub's
    /// error payload when one is present, otherwise the raw body.
    #[error("GitHub API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Authentication or GitHub client initialization failure.
    ///
    /// This error occurs when:
    /// - The token or GitHub App credentials are invalid or expired
    /// - The private key cannot be parsed
    /// - The API answered with 401
    #[error("Failed to authenticate or initialize GitHub client: {0}")]
    AuthError(String),

    /// Error deserializing the response from GitHub.
    #[error("Failed to deserialize GitHub response: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The GraphQL endpoint answered with an `errors` array.
    #[error("GraphQL query failed: {0}")]
    GraphQl(String),

    /// The GitHub API returned a response in an unexpected format.
    #[error("Invalid response format")]
    InvalidResponse,

    /// The request never produced an HTTP response.
    ///
    /// Connection resets, DNS failures and timeouts end up here.
    #[error("Network failure talking to GitHub: {0}")]
    Network(String),

    /// The requested resource was not found.
    #[error("Resource not found")]
    NotFound,

    /// GitHub API rate limit has been exceeded and retries were exhausted.
    ///
    /// `reset_at` is the epoch second from the `X-RateLimit-Reset` header, when
    /// GitHub sent one.
    #[error("Rate limit exceeded")]
    RateLimitExceeded { reset_at: Option<u64> },

    /// A server-side failure (5xx) that persisted through every retry.
    #[error("GitHub API returned transient status {status} after retries")]
    Transient { status: u16 },
}

impl Error {
    /// Classifies the error into the action a caller should take.
    ///
    /// Retries inside the client have already been spent by the time an error
    /// reaches the caller, so `Retry` here means "worth another attempt later",
    /// for example a whole clone or a whole batch.
    pub fn disposition(&self) -> Disposition {
        match self {
            Error::AuthError(_) => Disposition::Abort,
            Error::RateLimitExceeded { .. } | Error::Transient { .. } | Error::Network(_) => {
                Disposition::Retry
            }
            Error::Api { .. }
            | Error::Deserialization(_)
            | Error::GraphQl(_)
            | Error::InvalidResponse
            | Error::NotFound => Disposition::Skip,
        }
    }

    /// Returns the HTTP status that produced the error, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } | Error::Transient { status } => Some(*status),
            Error::NotFound => Some(404),
            _ => None,
        }
    }
}
