use super::*;
use crate::RetryPolicy;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server: &MockServer) -> GitHubClient {
    let octocrab = octocrab::Octocrab::builder()
        .base_uri(server.uri())
        .unwrap()
        .personal_token("test-token".to_string())
        .build()
        .unwrap();
    GitHubClient::new(octocrab).with_retry_policy(RetryPolicy::none())
}

#[test]
fn test_ruleset_summary_deserialization() {
    let summary: RulesetSummary = serde_json::from_value(json!({
        "id": 21,
        "name": "protect-main",
        "target": "branch",
        "source_type": "Organization",
        "source": "acme",
        "enforcement": "active",
        "node_id": "RRS_1",
        "_links": { "self": { "href": "https://api.github.com/orgs/acme/rulesets/21" } }
    }))
    .unwrap();

    assert_eq!(summary.id, 21);
    assert_eq!(summary.enforcement.as_deref(), Some("active"));
}

#[tokio::test]
async fn test_list_and_get_org_rulesets() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orgs/acme/rulesets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "main" },
            { "id": 2, "name": "tags", "target": "tag" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme/rulesets/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 2,
            "name": "tags",
            "rules": [{ "type": "deletion" }]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let rulesets = client.list_org_rulesets("acme").await.unwrap();
    let full = client.get_org_ruleset("acme", rulesets[1].id).await.unwrap();

    assert_eq!(rulesets.len(), 2);
    assert_eq!(full["rules"][0]["type"], "deletion");
}
