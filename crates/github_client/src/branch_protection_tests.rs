use super::*;
use crate::RetryPolicy;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
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
fn test_request_keeps_required_nulls() {
    let request = BranchProtectionRequest::default();
    let value = serde_json::to_value(&request).unwrap();

    assert!(value.get("required_status_checks").unwrap().is_null());
    assert!(value.get("restrictions").unwrap().is_null());
    assert!(value.get("required_pull_request_reviews").unwrap().is_null());
    assert_eq!(value["enforce_admins"], false);
}

#[test]
fn test_review_rules_serialization() {
    let rules = PullRequestReviewRules {
        dismiss_stale_reviews: true,
        required_approving_review_count: 2,
        bypass_pull_request_allowances: Some(BypassAllowances {
            users: vec!["release-bot".to_string()],
            ..Default::default()
        }),
        ..Default::default()
    };

    let value = serde_json::to_value(&rules).unwrap();

    assert_eq!(value["require_code_owner_reviews"], true);
    assert_eq!(value["required_approving_review_count"], 2);
    assert_eq!(
        value["bypass_pull_request_allowances"]["users"],
        json!(["release-bot"])
    );
}

#[tokio::test]
async fn test_get_branch_protection_unprotected_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/branches/main/protection"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({ "message": "Branch not protected" })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server);
    let protection = client
        .get_branch_protection("acme", "widgets", "main")
        .await
        .unwrap();

    assert!(protection.is_none());
}

#[tokio::test]
async fn test_put_branch_protection_sends_payload() {
    let server = MockServer::start().await;
    let request = BranchProtectionRequest {
        enforce_admins: true,
        required_pull_request_reviews: Some(PullRequestReviewRules::default()),
        required_conversation_resolution: true,
        ..Default::default()
    };

    Mock::given(method("PUT"))
        .and(path("/repos/acme/widgets/branches/develop/protection"))
        .and(body_json(serde_json::to_value(&request).unwrap()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    client
        .put_branch_protection("acme", "widgets", "develop", &request)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_put_branch_protection_surfaces_validation_errors() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/repos/acme/widgets/branches/main/protection"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "message": "Validation Failed" })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client
        .put_branch_protection("acme", "widgets", "main", &BranchProtectionRequest::default())
        .await;

    match result {
        Err(Error::Api { status, message }) => {
            assert_eq!(status, 422);
            assert_eq!(message, "Validation Failed");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
