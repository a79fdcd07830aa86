//! Branch protection domain types and operations.
//!
//! The write payload mirrors the REST "update branch protection" body. GitHub
//! requires `required_status_checks`, `enforce_admins`,
//! `required_pull_request_reviews` and `restrictions` to be present even when
//! null, so those fields are never skipped during serialization.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::{encode_path_segment, Error, GitHubClient};

#[cfg(test)]
#[path = "branch_protection_tests.rs"]
mod tests;

/// Body of `PUT /repos/{owner}/{repo}/branches/{branch}/protection`.
///
/// # Examples
///
/// ```rust
/// use github_client::{BranchProtectionRequest, PullRequestReviewRules};
///
/// let request = BranchProtectionRequest {
///     enforce_admins: true,
///     required_pull_request_reviews: Some(PullRequestReviewRules {
///         required_approving_review_count: 2,
///         ..Default::default()
///     }),
///     ..Default::default()
/// };
/// assert!(request.restrictions.is_none());
/// ```
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct BranchProtectionRequest {
    pub required_status_checks: Option<Value>,
    pub enforce_admins: bool,
    pub required_pull_request_reviews: Option<PullRequestReviewRules>,
    pub restrictions: Option<Value>,
    pub required_linear_history: bool,
    pub allow_force_pushes: bool,
    pub allow_deletions: bool,
    pub block_creations: bool,
    pub required_conversation_resolution: bool,
}

/// Pull request review requirements.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct PullRequestReviewRules {
    pub dismiss_stale_reviews: bool,
    pub require_code_owner_reviews: bool,
    pub required_approving_review_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bypass_pull_request_allowances: Option<BypassAllowances>,
}

impl Default for PullRequestReviewRules {
    fn default() -> Self {
        Self {
            dismiss_stale_reviews: false,
            require_code_owner_reviews: true,
            required_approving_review_count: 1,
            bypass_pull_request_allowances: None,
        }
    }
}

/// Users, teams and apps allowed to bypass the review requirement.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct BypassAllowances {
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default)]
    pub apps: Vec<String>,
}

impl GitHubClient {
    /// Reads the protection of a branch as raw JSON.
    ///
    /// Returns `None` when the branch is not protected.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo, branch = %branch))]
    pub async fn get_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Option<Value>, Error> {
        self.get_optional(&format!(
            "/repos/{owner}/{repo}/branches/{}/protection",
            encode_path_segment(branch)
        ))
        .await
    }

    /// Replaces the protection of a branch.
    #[instrument(skip(self, request), fields(owner = %owner, repo = %repo, branch = %branch))]
    pub async fn put_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        request: &BranchProtectionRequest,
    ) -> Result<(), Error> {
        self.put(
            &format!(
                "/repos/{owner}/{repo}/branches/{}/protection",
                encode_path_segment(branch)
            ),
            request,
        )
        .await?;
        Ok(())
    }
}
