use super::*;
use crate::test_support::test_client;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_audit_no_access_reports_repositories_without_entries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/shared/collaborators"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "login": "alice" }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/team-only/collaborators"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/team-only/teams"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "name": "Devs", "slug": "devs" }])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/orphan/collaborators"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/orphan/teams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/ghost/collaborators"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let repos: Vec<String> = ["shared", "team-only", "orphan", "ghost"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let table = audit_no_access(&client, "acme", &repos).await.unwrap();

    assert_eq!(table.headers(), &[NO_ACCESS_COLUMN]);
    assert_eq!(table.column(NO_ACCESS_COLUMN).unwrap(), vec!["orphan"]);
}

#[tokio::test]
async fn test_grant_team_access_sorts_results_and_keeps_failures() {
    let server = MockServer::start().await;

    for repo in ["beta", "Alpha"] {
        Mock::given(method("PUT"))
            .and(path(format!("/orgs/acme/teams/readers/repos/acme/{repo}")))
            .and(body_json(json!({ "permission": "pull" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("PUT"))
        .and(path("/orgs/acme/teams/readers/repos/acme/gamma"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({ "message": "Validation Failed" })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let repos: Vec<String> = ["gamma", "beta", "Alpha"].iter().map(|s| s.to_string()).collect();
    let summary = grant_team_access(&client, "acme", "readers", &repos, "pull", 4, false)
        .await
        .unwrap();

    assert_eq!(summary.ok, 2);
    assert_eq!(summary.total, 3);
    let order: Vec<&str> = summary.results.iter().map(|r| r.repo.as_str()).collect();
    assert_eq!(order, vec!["Alpha", "beta", "gamma"]);
    assert!(!summary.results[2].ok);
    assert!(summary.results[2].message.contains("Validation Failed"));

    let table = summary.to_table();
    assert_eq!(table.rows()[2][1], "FAILED");
}

#[tokio::test]
async fn test_grant_team_access_dry_run_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let repos = vec!["widgets".to_string()];
    let summary = grant_team_access(&client, "acme", "readers", &repos, "pull", 2, true)
        .await
        .unwrap();

    assert_eq!(summary.ok, 1);
    assert_eq!(summary.results[0].message, "dry run");
}

#[tokio::test]
async fn test_grant_team_access_rejects_unknown_permission() {
    let server = MockServer::start().await;
    let client = test_client(&server);

    let result =
        grant_team_access(&client, "acme", "readers", &["x".to_string()], "owner", 2, false).await;

    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

#[tokio::test]
async fn test_team_acl_report_finds_highest_permission() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orgs/acme/teams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "Platform", "slug": "platform" },
            { "name": "Auditors", "slug": "auditors" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme/teams/platform/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "widgets", "permissions": { "pull": true, "push": true } },
            { "name": "infra", "permissions": { "admin": true, "pull": true } }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme/teams/auditors/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let workbook = team_acl_report(&client, "acme", 2).await.unwrap();

    let teams = workbook.sheet("Teams").unwrap();
    assert_eq!(teams.rows()[0], vec!["Auditors", "auditors", "0", "none"]);
    assert_eq!(teams.rows()[1], vec!["Platform", "platform", "2", "admin"]);
    assert_eq!(workbook.sheet("Team_Repositories").unwrap().len(), 2);
}

#[tokio::test]
async fn test_collaborator_report_lists_roles() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/collaborators"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "login": "alice", "role_name": "maintain" },
            { "login": "bob", "permissions": { "pull": true } }
        ])))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let table = collaborator_report(&client, "acme", &["widgets".to_string()])
        .await
        .unwrap();

    assert_eq!(table.rows()[0], vec!["widgets", "alice", "maintain"]);
    assert_eq!(table.rows()[1], vec!["widgets", "bob", "pull"]);
}
