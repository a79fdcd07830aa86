//! GraphQL queries that have no efficient REST equivalent: bulk repository
//! traversal, branch head dates and SAML identities.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::{Error, GitHubClient};

#[cfg(test)]
#[path = "graphql_tests.rs"]
mod tests;

const ORG_REPOSITORIES_QUERY: &str = r#"
query($org: String!, $cursor: String) {
  organization(login: $org) {
    repositories(first: 50, after: $cursor) {
      pageInfo { hasNextPage endCursor }
      nodes { name isArchived isPrivate }
    }
  }
}"#;

const BRANCH_HEADS_QUERY: &str = r#"
query($owner: String!, $name: String!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    refs(refPrefix: "refs/heads/", first: 100, after: $cursor) {
      pageInfo { hasNextPage endCursor }
      nodes {
        name
        target { ... on Commit { committedDate } }
      }
    }
  }
}"#;

const SAML_IDENTITIES_QUERY: &str = r#"
query($org: String!, $cursor: String) {
  organization(login: $org) {
    samlIdentityProvider {
      externalIdentities(first: 100, after: $cursor) {
        pageInfo { hasNextPage endCursor }
        edges {
          node {
            samlIdentity { nameId }
            user { login }
          }
        }
      }
    }
  }
}"#;

/// A repository as listed by the organization GraphQL connection.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryNode {
    pub name: String,
    pub is_archived: bool,
    pub is_private: bool,
}

/// A branch and the commit date of its head.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchHead {
    pub name: String,
    /// `None` when the ref does not point at a commit
    pub committed_date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Deserialize)]
struct Connection<T> {
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
}

#[derive(Deserialize)]
struct OrgRepositoriesData {
    organization: Option<OrgRepositories>,
}

#[derive(Deserialize)]
struct OrgRepositories {
    repositories: Connection<RepositoryNode>,
}

#[derive(Deserialize)]
struct BranchHeadsData {
    repository: Option<RepositoryRefs>,
}

#[derive(Deserialize)]
struct RepositoryRefs {
    refs: Connection<RefNode>,
}

#[derive(Deserialize)]
struct RefNode {
    name: String,
    target: Option<RefTarget>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefTarget {
    committed_date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct SamlData {
    organization: Option<SamlOrganization>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SamlOrganization {
    saml_identity_provider: Option<SamlProvider>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SamlProvider {
    external_identities: IdentityConnection,
}

#[derive(Deserialize)]
struct IdentityConnection {
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
    #[serde(default)]
    edges: Vec<IdentityEdge>,
}

#[derive(Deserialize)]
struct IdentityEdge {
    node: Option<IdentityNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityNode {
    saml_identity: Option<SamlIdentity>,
    user: Option<LoginNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SamlIdentity {
    name_id: Option<String>,
}

#[derive(Deserialize)]
struct LoginNode {
    login: String,
}

impl GitHubClient {
    /// Lists every repository of an organization with its archive and privacy flags.
    #[instrument(skip(self))]
    pub async fn list_org_repository_nodes(&self, org: &str) -> Result<Vec<RepositoryNode>, Error> {
        let mut nodes = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let data: OrgRepositoriesData = self
                .graphql(
                    ORG_REPOSITORIES_QUERY,
                    json!({ "org": org, "cursor": cursor }),
                )
                .await?;
            let connection = data.organization.ok_or(Error::NotFound)?.repositories;

            nodes.extend(connection.nodes);
            debug!(org = org, fetched = nodes.len(), "Fetched repository page");

            match (connection.page_info.has_next_page, connection.page_info.end_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        info!(org = org, count = nodes.len(), "Listed repositories through GraphQL");
        Ok(nodes)
    }

    /// Lists every branch of a repository with the commit date of its head.
    #[instrument(skip(self))]
    pub async fn branch_heads(&self, owner: &str, repo: &str) -> Result<Vec<BranchHead>, Error> {
        let mut heads = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let data: BranchHeadsData = self
                .graphql(
                    BRANCH_HEADS_QUERY,
                    json!({ "owner": owner, "name": repo, "cursor": cursor }),
                )
                .await?;
            let connection = data.repository.ok_or(Error::NotFound)?.refs;

            heads.extend(connection.nodes.into_iter().map(|n| BranchHead {
                name: n.name,
                committed_date: n.target.and_then(|t| t.committed_date),
            }));

            match (connection.page_info.has_next_page, connection.page_info.end_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        Ok(heads)
    }

    /// Maps member logins to their SAML `nameId`.
    ///
    /// Organizations without SAML single sign-on yield an empty map.
    #[instrument(skip(self))]
    pub async fn saml_identities(&self, org: &str) -> Result<HashMap<String, String>, Error> {
        let mut identities = HashMap::new();
        let mut cursor: Option<String> = None;

        loop {
            let data: SamlData = self
                .graphql(SAML_IDENTITIES_QUERY, json!({ "org": org, "cursor": cursor }))
                .await?;
            let Some(provider) = data
                .organization
                .and_then(|o| o.saml_identity_provider)
            else {
                info!(org = org, "Organization has no SAML identity provider");
                return Ok(identities);
            };
            let connection = provider.external_identities;

            for node in connection.edges.into_iter().filter_map(|e| e.node) {
                let login = node.user.map(|u| u.login);
                let name_id = node.saml_identity.and_then(|s| s.name_id);
                if let (Some(login), Some(name_id)) = (login, name_id) {
                    identities.insert(login, name_id);
                }
            }

            match (connection.page_info.has_next_page, connection.page_info.end_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        info!(org = org, count = identities.len(), "Loaded SAML identities");
        Ok(identities)
    }
}
