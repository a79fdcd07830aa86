//! Helpers shared by the unit tests of this crate.

use github_client::{GitHubClient, RetryPolicy};
use serde_json::{json, Value};
use wiremock::MockServer;

pub(crate) fn test_client(server: &MockServer) -> GitHubClient {
    let octocrab = octocrab::Octocrab::builder()
        .base_uri(server.uri())
        .unwrap()
        .personal_token("test-token".to_string())
        .build()
        .unwrap();
    GitHubClient::new(octocrab).with_retry_policy(RetryPolicy::none())
}

pub(crate) fn repo_json(name: &str, private: bool, archived: bool) -> Value {
    json!({
        "id": name.len() as u64 * 1000,
        "name": name,
        "full_name": format!("acme/{name}"),
        "private": private,
        "archived": archived,
        "default_branch": "main",
        "size": 2048,
        "owner": { "login": "acme", "id": 1 },
        "created_at": "2020-01-01T00:00:00Z",
        "updated_at": "2023-06-01T00:00:00Z",
        "pushed_at": "2023-05-01T10:00:00Z"
    })
}
