use super::*;
use crate::RetryPolicy;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
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

#[tokio::test]
async fn test_list_org_repository_nodes_follows_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({ "variables": { "org": "acme", "cursor": null } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "organization": { "repositories": {
                "pageInfo": { "hasNextPage": true, "endCursor": "c1" },
                "nodes": [{ "name": "a", "isArchived": false, "isPrivate": true }]
            }}}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({ "variables": { "cursor": "c1" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "organization": { "repositories": {
                "pageInfo": { "hasNextPage": false, "endCursor": null },
                "nodes": [{ "name": "b", "isArchived": true, "isPrivate": false }]
            }}}
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let nodes = client.list_org_repository_nodes("acme").await.unwrap();

    assert_eq!(nodes.len(), 2);
    assert!(nodes[1].is_archived);
}

#[tokio::test]
async fn test_branch_heads_handles_non_commit_targets() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "repository": { "refs": {
                "pageInfo": { "hasNextPage": false, "endCursor": null },
                "nodes": [
                    { "name": "main", "target": { "committedDate": "2015-06-01T12:00:00Z" } },
                    { "name": "odd", "target": {} }
                ]
            }}}
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let heads = client.branch_heads("acme", "widgets").await.unwrap();

    assert_eq!(heads.len(), 2);
    assert!(heads[0].committed_date.is_some());
    assert!(heads[1].committed_date.is_none());
}

#[tokio::test]
async fn test_graphql_errors_are_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "message": "Could not resolve to a Repository" }]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client.branch_heads("acme", "missing").await;

    match result {
        Err(Error::GraphQl(message)) => assert!(message.contains("Could not resolve")),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_saml_identities_without_provider() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "organization": { "samlIdentityProvider": null } }
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let identities = client.saml_identities("acme").await.unwrap();

    assert!(identities.is_empty());
}

#[tokio::test]
async fn test_saml_identities_maps_login_to_name_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "organization": { "samlIdentityProvider": { "externalIdentities": {
                "pageInfo": { "hasNextPage": false, "endCursor": null },
                "edges": [
                    { "node": { "samlIdentity": { "nameId": "jo@acme.com" }, "user": { "login": "jo" } } },
                    { "node": { "samlIdentity": { "nameId": "orphan@acme.com" }, "user": null } }
                ]
            }}}}
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let identities = client.saml_identities("acme").await.unwrap();

    assert_eq!(identities.len(), 1);
    assert_eq!(identities["jo"], "jo@acme.com");
}
