//! Activity signals: public user events, the organization audit log and
//! GitHub Actions workflows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::{encode_query_value, Error, GitHubClient};

#[cfg(test)]
#[path = "activity_tests.rs"]
mod tests;

/// A public event performed by a user.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PublicEvent {
    pub id: String,
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One entry of the organization audit log.
///
/// The timestamp arrives as `@timestamp` (epoch milliseconds) or `created_at`
/// (epoch milliseconds or ISO-8601, depending on the GitHub version), so it is
/// kept as raw JSON and interpreted by [`AuditLogEntry::timestamp`].
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AuditLogEntry {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(rename = "@timestamp", default)]
    pub at_timestamp: Option<Value>,
    #[serde(default)]
    pub created_at: Option<Value>,
}

impl AuditLogEntry {
    /// Returns the entry time, accepting ISO-8601, epoch seconds and epoch
    /// milliseconds.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.at_timestamp
            .as_ref()
            .and_then(parse_flexible_timestamp)
            .or_else(|| self.created_at.as_ref().and_then(parse_flexible_timestamp))
    }
}

/// Parses a timestamp that may be an ISO-8601 string or a number of epoch
/// seconds or milliseconds. Values of 1e12 or more are taken as milliseconds.
pub fn parse_flexible_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let raw = n.as_f64()?;
            if raw >= 1e12 {
                DateTime::from_timestamp_millis(raw as i64)
            } else {
                DateTime::from_timestamp(raw as i64, 0)
            }
        }
        Value::String(s) => {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
                return Some(parsed.with_timezone(&Utc));
            }
            s.parse::<f64>()
                .ok()
                .and_then(|n| parse_flexible_timestamp(&Value::from(n)))
        }
        _ => None,
    }
}

/// A GitHub Actions workflow definition.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Workflow {
    pub id: u64,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub state: Option<String>,
}

/// A single run of a workflow.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct WorkflowRun {
    pub id: u64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct WorkflowRuns {
    #[serde(default)]
    workflow_runs: Vec<WorkflowRun>,
}

impl GitHubClient {
    /// Returns the most recent public event of a user, if any.
    #[instrument(skip(self))]
    pub async fn latest_public_event(&self, login: &str) -> Result<Option<PublicEvent>, Error> {
        let events: Option<Vec<PublicEvent>> = self
            .get_optional(&format!("/users/{login}/events/public?per_page=100"))
            .await?;
        Ok(events
            .unwrap_or_default()
            .into_iter()
            .max_by_key(|e| e.created_at))
    }

    /// Returns the newest audit log entry matching `phrase`.
    ///
    /// Requires an owner token on an organization with audit log access.
    #[instrument(skip(self))]
    pub async fn search_audit_log(
        &self,
        org: &str,
        phrase: &str,
    ) -> Result<Option<AuditLogEntry>, Error> {
        let path = format!(
            "/orgs/{org}/audit-log?phrase={}&per_page=1&order=desc&include=all",
            encode_query_value(phrase)
        );
        let entries: Vec<AuditLogEntry> = self.get_json(&path).await?;
        Ok(entries.into_iter().next())
    }

    /// Lists the workflows of a repository.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    pub async fn list_workflows(&self, owner: &str, repo: &str) -> Result<Vec<Workflow>, Error> {
        self.paginate_wrapped(
            &format!("/repos/{owner}/{repo}/actions/workflows"),
            "workflows",
        )
        .await
    }

    /// Returns the latest run of a workflow, if it ever ran.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    pub async fn latest_workflow_run(
        &self,
        owner: &str,
        repo: &str,
        workflow_id: u64,
    ) -> Result<Option<WorkflowRun>, Error> {
        let runs: WorkflowRuns = self
            .get_json(&format!(
                "/repos/{owner}/{repo}/actions/workflows/{workflow_id}/runs?per_page=1"
            ))
            .await?;
        Ok(runs.workflow_runs.into_iter().next())
    }
}
