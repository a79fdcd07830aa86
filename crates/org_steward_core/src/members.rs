//! Organization member directory joined with SAML SSO identities.

use github_client::{Disposition, GitHubClient};
use tracing::{error, info, instrument, warn};

use crate::errors::Result;
use crate::report::Table;

#[cfg(test)]
#[path = "members_tests.rs"]
mod tests;

pub const MEMBER_COLUMNS: [&str; 5] = ["Username", "Email", "FirstName", "LastName", "SSOId"];

/// One row per organization member with profile details and the SSO name ID.
///
/// A member whose profile cannot be read keeps empty name and email cells.
/// Organizations without SAML SSO yield empty `SSOId` cells.
#[instrument(skip(client))]
pub async fn member_sso_report(client: &GitHubClient, org: &str) -> Result<Table> {
    let members = client.list_org_members(org).await?;
    info!(members = members.len(), "Fetched organization members");

    let identities = match client.saml_identities(org).await {
        Ok(map) => map,
        Err(e) if e.disposition() == Disposition::Abort => return Err(e.into()),
        Err(e) => {
            warn!(error = %e, "Could not read SSO identities, leaving SSOId empty");
            Default::default()
        }
    };
    info!(identities = identities.len(), "Fetched SSO identities");

    let mut table = Table::new(MEMBER_COLUMNS);
    for member in members {
        let (email, first, last) = match client.get_user(&member.login).await {
            Ok(profile) => {
                let (first, last) = profile.split_name();
                (profile.email.unwrap_or_default(), first, last)
            }
            Err(e) if e.disposition() == Disposition::Abort => return Err(e.into()),
            Err(e) => {
                error!(user = %member.login, error = %e, "Failed to read profile");
                Default::default()
            }
        };
        let sso = identities.get(&member.login).cloned().unwrap_or_default();
        table.push_row([member.login, email, first, last, sso]);
    }
    Ok(table)
}
