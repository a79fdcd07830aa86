//! Crate for interacting with the GitHub REST and GraphQL APIs.
//!
//! This crate wraps an authenticated [`Octocrab`] instance and adds the pieces
//! the administrative operations depend on: bounded retries with rate-limit
//! awareness, page-number pagination, a GraphQL helper and typed models for the
//! repository, access, protection, contents, installation and activity APIs.
//!
//! Clients are created either from a personal access token
//! ([`create_token_client`]) or from GitHub App credentials
//! ([`create_app_client`]).

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use http::Method;
use jsonwebtoken::EncodingKey;
use octocrab::Octocrab;
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

pub mod errors;
pub use errors::{Disposition, Error};

pub mod retry;
pub use retry::{classify_status, RetryPolicy, StatusClass};

pub mod access;
pub use access::{Collaborator, Invitation, Permissions, Team};

pub mod activity;
pub use activity::{AuditLogEntry, PublicEvent, Workflow, WorkflowRun};

pub mod branch_protection;
pub use branch_protection::{BranchProtectionRequest, BypassAllowances, PullRequestReviewRules};

pub mod contents;
pub use contents::{EntryType, FileContent, FileUpdate, GitTree, GitTreeEntry, TreeEntry};

pub mod graphql;
pub use graphql::{BranchHead, RepositoryNode};

pub mod installation;
pub use installation::{Account, Installation, RateLimit, RateLimitResource};

pub mod repository;
pub use repository::{
    Branch, CommitSummary, Repository, RepositoryCreatePayload, RepositoryUpdate,
};

pub mod ruleset;
pub use ruleset::RulesetSummary;

pub mod user;
pub use user::{User, UserProfile};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Default number of items requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// A successful (2xx) response from the GitHub API.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response body. Empty for 204 responses.
    pub body: String,
}

impl ApiResponse {
    /// Deserializes the body. An empty body is read as JSON `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if self.body.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// A client for the GitHub API.
///
/// The client is cheap to clone; clones share the underlying HTTP connection
/// pool.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Octocrab,
    retry: RetryPolicy,
    page_size: u32,
}

impl GitHubClient {
    /// Wraps an authenticated `Octocrab` instance using the default retry policy.
    pub fn new(client: Octocrab) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Replaces the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the page size used by [`GitHubClient::paginate`]. Clamped to 1..=100.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, 100);
        self
    }

    /// Returns the retry policy in use.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Sends a request and applies the retry policy.
    ///
    /// `path` is relative to the API root, e.g. `/repos/octo/hello?per_page=1`.
    /// Returns the response for any 2xx status and an [`Error`] otherwise.
    #[instrument(skip(self, body), fields(method = %method, path = %path))]
    pub async fn send<B: Serialize + ?Sized + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse, Error> {
        let payload = match body {
            Some(b) => Some(serde_json::to_value(b)?),
            None => None,
        };

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let outcome = self.send_once(&method, path, payload.as_ref()).await;

            let (error, delay) = match outcome {
                Ok(RawOutcome {
                    status,
                    remaining,
                    reset,
                    body,
                }) => match classify_status(status, remaining, &body) {
                    StatusClass::Success => return Ok(ApiResponse { status, body }),
                    StatusClass::NotFound => return Err(Error::NotFound),
                    StatusClass::Unauthorized => {
                        return Err(Error::AuthError(error_message(&body)))
                    }
                    StatusClass::Permanent => {
                        return Err(Error::Api {
                            status,
                            message: error_message(&body),
                        })
                    }
                    StatusClass::RateLimited => {
                        let delay = self.retry.rate_limit_delay(reset, now_epoch(), attempt);
                        (Error::RateLimitExceeded { reset_at: reset }, delay)
                    }
                    StatusClass::Transient => {
                        (Error::Transient { status }, self.retry.backoff_delay(attempt))
                    }
                },
                Err(e) => (e, self.retry.backoff_delay(attempt)),
            };

            if !self.retry.should_retry(attempt) {
                error!(
                    attempt = attempt,
                    error = %error,
                    "GitHub request failed, retries exhausted"
                );
                return Err(error);
            }

            warn!(
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "GitHub request failed, backing off before retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<RawOutcome, Error> {
        let uri = path.to_string();
        let response = match *method {
            Method::GET => self.client._get(uri).await,
            Method::POST => self.client._post(uri, payload).await,
            Method::PUT => self.client._put(uri, payload).await,
            Method::PATCH => self.client._patch(uri, payload).await,
            Method::DELETE => self.client._delete(uri, payload).await,
            _ => return Err(Error::InvalidResponse),
        };

        let response = response.map_err(|e| {
            log_octocrab_error("Failed to send request to GitHub", &e);
            Error::Network(e.to_string())
        })?;

        let status = response.status().as_u16();
        let remaining = header_u64(response.headers(), "x-ratelimit-remaining");
        let reset = header_u64(response.headers(), "x-ratelimit-reset");

        let body = self.client.body_to_string(response).await.map_err(|e| {
            log_octocrab_error("Failed to read response body from GitHub", &e);
            Error::Network(e.to_string())
        })?;

        debug!(status = status, remaining = ?remaining, "GitHub responded");

        Ok(RawOutcome {
            status,
            remaining,
            reset,
            body,
        })
    }

    /// GETs `path` and deserializes the body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.send(Method::GET, path, None::<&()>).await?.json()
    }

    /// GETs `path`, mapping a 404 to `None`.
    pub async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, Error> {
        match self.get_json(path).await {
            Ok(v) => Ok(Some(v)),
            Err(Error::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// POSTs `body` to `path` and deserializes the response.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send(Method::POST, path, Some(body)).await?.json()
    }

    /// PUTs `body` to `path` and returns the raw response.
    pub async fn put<B: Serialize + ?Sized + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, Error> {
        self.send(Method::PUT, path, Some(body)).await
    }

    /// PATCHes `body` to `path` and deserializes the response.
    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send(Method::PATCH, path, Some(body)).await?.json()
    }

    /// DELETEs `path`.
    ///
    /// Returns `true` when something was removed and `false` when GitHub reported
    /// the resource as already gone (404).
    pub async fn delete(&self, path: &str) -> Result<bool, Error> {
        match self.send(Method::DELETE, path, None::<&()>).await {
            Ok(_) => Ok(true),
            Err(Error::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Collects every item of a paginated list endpoint that returns a JSON array.
    pub async fn paginate<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, Error> {
        self.paginate_inner(path, None).await
    }

    /// Collects every item of a paginated endpoint that wraps its items in an
    /// object, e.g. `{"total_count": 3, "repositories": [...]}`.
    pub async fn paginate_wrapped<T: DeserializeOwned>(
        &self,
        path: &str,
        key: &str,
    ) -> Result<Vec<T>, Error> {
        self.paginate_inner(path, Some(key)).await
    }

    async fn paginate_inner<T: DeserializeOwned>(
        &self,
        path: &str,
        key: Option<&str>,
    ) -> Result<Vec<T>, Error> {
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut items = Vec::new();
        let mut page: u32 = 1;

        loop {
            let uri = format!(
                "{path}{separator}per_page={}&page={page}",
                self.page_size
            );
            let value: Value = self.get_json(&uri).await?;
            let array = match key {
                Some(k) => value.get(k).cloned().unwrap_or(Value::Array(Vec::new())),
                None => value,
            };
            let Value::Array(entries) = array else {
                error!(path = path, "Expected a JSON array in paginated response");
                return Err(Error::InvalidResponse);
            };

            let count = entries.len();
            for entry in entries {
                items.push(serde_json::from_value(entry)?);
            }

            debug!(path = path, page = page, count = count, "Fetched page");
            if count < self.page_size as usize {
                break;
            }
            page += 1;
        }

        Ok(items)
    }

    /// Runs a GraphQL query and returns its `data` member.
    #[instrument(skip(self, query, variables))]
    pub async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, Error> {
        let body = serde_json::json!({ "query": query, "variables": variables });
        let response: Value = self.post_json("/graphql", &body).await?;

        if let Some(errors) = response.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let message = errors
                    .iter()
                    .filter_map(|e| e.get("message").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join("; ");
                error!(message = %message, "GraphQL query returned errors");
                return Err(Error::GraphQl(message));
            }
        }

        let data = response.get("data").cloned().ok_or(Error::InvalidResponse)?;
        Ok(serde_json::from_value(data)?)
    }

    /// Creates a client authenticated as one installation of the GitHub App this
    /// client is authenticated as.
    ///
    /// The returned token can be handed to git for HTTPS operations.
    #[instrument(skip(self))]
    pub async fn installation_client(
        &self,
        installation_id: u64,
    ) -> Result<(GitHubClient, SecretString), Error> {
        let (client, token) = self
            .client
            .installation_and_token(installation_id.into())
            .await
            .map_err(|e| {
                error!(
                    installation_id = installation_id,
                    "Failed to create a token for the installation"
                );
                log_octocrab_error("Failed to get installation token", &e);
                Error::AuthError(format!(
                    "Failed to create a token for installation {installation_id}"
                ))
            })?;

        info!(
            installation_id = installation_id,
            "Created access token for installation"
        );

        Ok((
            GitHubClient {
                client,
                retry: self.retry.clone(),
                page_size: self.page_size,
            },
            token,
        ))
    }
}

struct RawOutcome {
    status: u16,
    remaining: Option<u64>,
    reset: Option<u64>,
    body: String,
}

fn header_u64(headers: &http::HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

/// Extracts GitHub's `message` field from an error body, falling back to the
/// raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Percent-encodes a value for use inside a query string.
pub fn encode_query_value(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Percent-encodes a single path segment, e.g. a branch name containing `/`.
///
/// Git ref names cannot contain spaces, so the form encoding of a space as `+`
/// never applies.
pub fn encode_path_segment(segment: &str) -> String {
    encode_query_value(segment)
}

/// Creates an `Octocrab` client authenticated as a GitHub App using a JWT token.
///
/// `base_uri` points the client at a GitHub Enterprise Server API root (or a
/// test server). `None` targets api.github.com.
///
/// # Errors
///
/// Returns `Error::AuthError` when the private key cannot be parsed or the
/// client cannot be built.
///
/// # Example
///
/// ```rust,no_run
/// use github_client::{create_app_client, Error, GitHubClient};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Error> {
///     let private_key = std::fs::read_to_string("app.pem").unwrap();
///     let octocrab = create_app_client(123456, &private_key, None).await?;
///     let client = GitHubClient::new(octocrab);
///     let installations = client.list_installations().await?;
///     println!("{} installations", installations.len());
///     Ok(())
/// }
/// ```
#[instrument(skip(private_key))]
pub async fn create_app_client(
    app_id: u64,
    private_key: &str,
    base_uri: Option<&str>,
) -> Result<Octocrab, Error> {
    info!(
        app_id = app_id,
        key_length = private_key.len(),
        "Creating GitHub App client with provided credentials"
    );

    let key = EncodingKey::from_rsa_pem(private_key.as_bytes()).map_err(|e| {
        error!(
            app_id = app_id,
            error = %e,
            "Failed to parse RSA private key - key format is invalid"
        );
        Error::AuthError(format!(
            "Failed to translate the private key. Error was: {e}"
        ))
    })?;

    let mut builder = Octocrab::builder();
    if let Some(uri) = base_uri {
        builder = builder.base_uri(uri).map_err(|e| {
            Error::AuthError(format!("Invalid GitHub API base URI '{uri}': {e}"))
        })?;
    }

    let octocrab = builder.app(app_id.into(), key).build().map_err(|e| {
        error!(
            app_id = app_id,
            error = ?e,
            "Failed to build Octocrab client with GitHub App credentials"
        );
        Error::AuthError("Failed to build a client for the GitHub App.".to_string())
    })?;

    info!(app_id = app_id, "Successfully created GitHub App client");

    Ok(octocrab)
}

/// Creates an `Octocrab` client authenticated with a personal access token.
#[instrument(skip(token))]
pub fn create_token_client(token: &str, base_uri: Option<&str>) -> Result<Octocrab, Error> {
    let mut builder = Octocrab::builder();
    if let Some(uri) = base_uri {
        builder = builder.base_uri(uri).map_err(|e| {
            Error::AuthError(format!("Invalid GitHub API base URI '{uri}': {e}"))
        })?;
    }

    builder
        .personal_token(token.to_string())
        .build()
        .map_err(|e| Error::AuthError(format!("Failed to build GitHub client: {e}")))
}

fn log_octocrab_error(message: &str, e: &octocrab::Error) {
    match e {
        octocrab::Error::GitHub { source, .. } => error!(
            error_message = source.message,
            "{}. Received an error from GitHub", message
        ),
        octocrab::Error::UriParse { source, .. } => error!(
            error_message = source.to_string(),
            "{}. Failed to parse URI.", message
        ),
        octocrab::Error::Uri { source, .. } => error!(
            error_message = source.to_string(),
            "{}. Failed to parse URI.", message
        ),
        octocrab::Error::InvalidHeaderValue { source, .. } => error!(
            error_message = source.to_string(),
            "{}. One of the header values was invalid.", message
        ),
        octocrab::Error::InvalidUtf8 { source, .. } => error!(
            error_message = source.to_string(),
            "{}. The message wasn't valid UTF-8.", message
        ),
        _ => error!(error_message = e.to_string(), "{}", message),
    };
}
