use super::*;
use secrecy::SecretString;
use serde_json::json;
use std::fs;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> TeamCityClient {
    TeamCityClient::new(&server.uri(), SecretString::from("tc".to_string()), false).unwrap()
}

fn seed_plugins(dir: &Path) {
    let slack = dir.join("slack");
    fs::create_dir_all(&slack).unwrap();
    fs::write(
        slack.join("teamcity-plugin.xml"),
        r#"<teamcity-plugin>
          <info><name>slack-notifier</name><vendor><name>JetBrains</name></vendor></info>
          <requirements><teamcity>2023.05, 2023.11</teamcity></requirements>
        </teamcity-plugin>"#,
    )
    .unwrap();
    let legacy = dir.join("legacy");
    fs::create_dir_all(&legacy).unwrap();
    fs::write(
        legacy.join("teamcity-plugin.xml"),
        r#"<teamcity-plugin>
          <info><name>legacy-runner</name><vendor><name>Acme</name></vendor></info>
          <requirements><teamcity>2019.2</teamcity></requirements>
        </teamcity-plugin>"#,
    )
    .unwrap();
    fs::write(dir.join("packaged.zip"), b"PK").unwrap();
    fs::write(dir.join("notes.txt"), "ignore me").unwrap();
}

#[tokio::test]
async fn test_plugin_compatibility_report_with_server_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app/rest/server"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": "2022.10.3 (build 117072)" })))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    seed_plugins(dir.path());

    let report = plugin_compatibility_report(Some(&client(&server)), dir.path(), "2023.11")
        .await
        .unwrap();

    assert_eq!(report.current_version, "2022.10.3 (build 117072)");
    assert_eq!(report.plugins.headers(), PLUGIN_COLUMNS);
    assert_eq!(
        report.plugins.column("Plugin Name").unwrap(),
        vec!["legacy-runner", "slack-notifier"]
    );
    assert_eq!(
        report.plugins.column("Compatible with Target Version?").unwrap(),
        vec!["No", "Yes"]
    );
    assert_eq!(
        report.installed.column(INSTALLED_PLUGIN_COLUMN).unwrap(),
        vec!["legacy", "packaged.zip", "slack"]
    );
}

#[tokio::test]
async fn test_plugin_compatibility_report_without_client() {
    let dir = tempfile::tempdir().unwrap();
    seed_plugins(dir.path());

    let report = plugin_compatibility_report(None, dir.path(), "2023.11")
        .await
        .unwrap();

    assert_eq!(report.current_version, "Unknown");
    assert_eq!(report.plugins.len(), 2);
}

#[tokio::test]
async fn test_plugin_compatibility_report_missing_dir() {
    let dir = tempfile::tempdir().unwrap();
    let result = plugin_compatibility_report(None, &dir.path().join("absent"), "2023.11").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_token_permission_report_lists_every_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app/rest/users/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "username": "svc" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/app/rest/agents"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let table = token_permission_report(&client(&server)).await;

    assert_eq!(table.len(), PERMISSION_ENDPOINTS.len());
    assert_eq!(table.rows()[0], vec!["User Info", "/app/rest/users/current", "Access granted"]);
    let agents = table.rows().iter().find(|r| r[0] == "Agents").unwrap();
    assert_eq!(agents[2], "Access denied (403 Forbidden)");
    let projects = table.rows().iter().find(|r| r[0] == "Projects").unwrap();
    assert_eq!(projects[2], "Unexpected response (404)");
}
