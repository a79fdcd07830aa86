use super::*;
use crate::RetryPolicy;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
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
fn test_repository_deserializes_with_missing_fields() {
    let repo: Repository = serde_json::from_value(json!({
        "name": "widgets",
        "full_name": "acme/widgets",
        "private": true
    }))
    .unwrap();

    assert_eq!(repo.name, "widgets");
    assert!(!repo.archived);
    assert_eq!(repo.visibility(), "private");
    assert_eq!(repo.owner_login(), Some("acme"));
    assert_eq!(repo.size, 0);
}

#[test]
fn test_repository_visibility_prefers_explicit_value() {
    let repo: Repository = serde_json::from_value(json!({
        "name": "widgets",
        "private": true,
        "visibility": "internal"
    }))
    .unwrap();

    assert_eq!(repo.visibility(), "internal");
}

#[test]
fn test_repository_update_skips_unset_fields() {
    let update = RepositoryUpdate {
        archived: Some(true),
        ..Default::default()
    };

    let value = serde_json::to_value(&update).unwrap();
    assert_eq!(value, json!({ "archived": true }));
}

#[test]
fn test_commit_summary_accessors() {
    let commit: CommitSummary = serde_json::from_value(json!({
        "sha": "abc",
        "commit": {
            "author": { "name": "Jo", "email": "jo@example.com", "date": "2020-01-02T03:04:05Z" },
            "committer": { "name": "Jo", "email": "jo@example.com", "date": "2020-01-03T03:04:05Z" },
            "message": "fix"
        },
        "author": { "id": 7, "login": "jo" }
    }))
    .unwrap();

    assert_eq!(commit.author_email(), Some("jo@example.com"));
    assert_eq!(commit.author_login(), Some("jo"));
    assert_eq!(
        commit.date().unwrap().to_rfc3339(),
        "2020-01-03T03:04:05+00:00"
    );
}

#[tokio::test]
async fn test_list_org_repositories_follows_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orgs/acme/repos"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "a", "full_name": "acme/a" },
            { "name": "b", "full_name": "acme/b" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme/repos"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "c", "full_name": "acme/c" }
        ])))
        .mount(&server)
        .await;

    let client = test_client(&server).with_page_size(2);
    let repos = client.list_org_repositories("acme").await.unwrap();

    let names: Vec<_> = repos.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_get_repository_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client.get_repository("acme", "missing").await;

    assert!(matches!(result, Err(Error::NotFound)));
}

#[tokio::test]
async fn test_latest_commit_on_empty_repository_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/empty/commits"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(json!({ "message": "Git Repository is empty." })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server);
    let commit = client.latest_commit("acme", "empty", "main").await.unwrap();

    assert!(commit.is_none());
}

#[tokio::test]
async fn test_delete_repository_reports_missing_repository() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/repos/acme/widgets"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/repos/acme/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    assert!(client.delete_repository("acme", "widgets").await.unwrap());
    assert!(!client.delete_repository("acme", "ghost").await.unwrap());
}
