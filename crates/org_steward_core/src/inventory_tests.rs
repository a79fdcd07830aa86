use super::*;
use crate::test_support::{repo_json, test_client};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn repo(name: &str, size: u64) -> Repository {
    Repository {
        name: name.to_string(),
        full_name: format!("acme/{name}"),
        size,
        private: true,
        html_url: Some(format!("https://github.com/acme/{name}")),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_archived_report_sorts_by_update_then_name() {
    let server = MockServer::start().await;

    let mut older = repo_json("older", true, true);
    older["updated_at"] = json!("2021-01-01T00:00:00Z");
    let mut beta = repo_json("beta", true, true);
    beta["updated_at"] = json!("2022-01-01T00:00:00Z");
    let mut alpha = repo_json("alpha", false, true);
    alpha["updated_at"] = json!("2022-01-01T00:00:00Z");
    let live = repo_json("live", true, false);

    Mock::given(method("GET"))
        .and(path("/orgs/acme/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([older, beta, live, alpha])))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let table = archived_repository_report(&client, "acme").await.unwrap();

    assert_eq!(table.column("name").unwrap(), vec!["alpha", "beta", "older"]);
    assert_eq!(table.column("visibility").unwrap(), vec!["public", "private", "private"]);
    assert_eq!(table.column("updated_at").unwrap()[0], "2022-01-01 00:00:00");
}

#[tokio::test]
async fn test_active_report_excludes_archived() {
    let server = MockServer::start().await;

    let mut internal = repo_json("shared", true, false);
    internal["visibility"] = json!("internal");
    Mock::given(method("GET"))
        .and(path("/orgs/acme/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            internal,
            repo_json("gone", true, true),
            repo_json("site", false, false)
        ])))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let table = active_repository_report(&client, "acme").await.unwrap();

    assert_eq!(
        table.rows(),
        &[
            vec!["shared".to_string(), "internal".to_string()],
            vec!["site".to_string(), "public".to_string()]
        ]
    );
}

#[tokio::test]
async fn test_branch_report_marks_default_and_skips_failures() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orgs/acme/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            repo_json("widgets", true, false),
            repo_json("broken", true, false)
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/branches"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "develop", "commit": { "sha": "1" } },
            { "name": "main", "commit": { "sha": "2" } }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/broken/branches"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let table = branch_report(&client, "acme", 2).await.unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.rows()[0], vec!["widgets", "develop", ""]);
    assert_eq!(table.rows()[1], vec!["", "main", "default"]);
}

#[tokio::test]
async fn test_size_estimates_triple_reported_size() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orgs/acme/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([repo_json("widgets", true, false)])))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let estimates = size_estimates(&client, "acme").await.unwrap();

    assert_eq!(estimates[0].default_branch_size_kb, 2048);
    assert_eq!(estimates[0].estimated_full_size_kb, 6144);
    assert_eq!(estimates[0].estimated_full_size_mb(), 6.0);

    let table = size_table(&estimates);
    assert_eq!(table.rows()[0], vec!["widgets", "2048", "6144", "6"]);
}

#[test]
fn test_split_by_size_puts_threshold_in_large() {
    let repos = vec![repo("tiny", 100), repo("edge", 200 * 1024), repo("huge", 900 * 1024)];

    let split = split_by_size(&repos, DEFAULT_SPLIT_THRESHOLD_MB);

    assert_eq!(split.all.len(), 3);
    assert_eq!(split.small.column("Name").unwrap(), vec!["tiny"]);
    assert_eq!(split.large.column("Name").unwrap(), vec!["edge", "huge"]);
    assert_eq!(split.small.rows()[0][3], "0.1");
}
