//! Organization ruleset operations.
//!
//! Rulesets are exported verbatim, so only the listing fields are typed and the
//! full ruleset is returned as raw JSON.
//!
//! See: https://docs.github.com/en/rest/orgs/rules

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use crate::{Error, GitHubClient};

#[cfg(test)]
#[path = "ruleset_tests.rs"]
mod tests;

/// A ruleset as returned by the LIST endpoint, which omits the rules themselves.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct RulesetSummary {
    pub id: u64,
    pub name: String,
    /// `branch`, `tag` or `push`
    #[serde(default)]
    pub target: Option<String>,
    /// `active`, `evaluate` or `disabled`
    #[serde(default)]
    pub enforcement: Option<String>,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

impl GitHubClient {
    /// Lists the rulesets of an organization.
    #[instrument(skip(self))]
    pub async fn list_org_rulesets(&self, org: &str) -> Result<Vec<RulesetSummary>, Error> {
        let rulesets: Vec<RulesetSummary> =
            self.paginate(&format!("/orgs/{org}/rulesets")).await?;
        info!(org = org, count = rulesets.len(), "Listed organization rulesets");
        Ok(rulesets)
    }

    /// Reads a single organization ruleset including its rules and conditions.
    #[instrument(skip(self))]
    pub async fn get_org_ruleset(&self, org: &str, ruleset_id: u64) -> Result<Value, Error> {
        self.get_json(&format!("/orgs/{org}/rulesets/{ruleset_id}"))
            .await
    }
}
