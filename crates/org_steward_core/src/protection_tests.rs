use super::*;
use crate::test_support::test_client;
use github_client::repository::CommitRef;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn branch(name: &str) -> Branch {
    Branch {
        name: name.to_string(),
        commit: CommitRef {
            sha: "abc".to_string(),
        },
        protected: false,
    }
}

#[test]
fn test_resolve_branch_prefers_exact_match() {
    let branches = vec![branch("Develop"), branch("develop"), branch("main")];

    assert_eq!(resolve_branch(&branches, "develop"), Some("develop"));
    assert_eq!(resolve_branch(&branches, "MAIN"), Some("main"));
    assert_eq!(resolve_branch(&branches, "release"), None);
}

#[test]
fn test_settings_request_strips_at_signs() {
    let settings = ProtectionSettings {
        bypass_users: vec!["@alice".to_string(), "bob".to_string()],
        required_approvals: 2,
        ..Default::default()
    };

    let request = settings.to_request();
    let reviews = request.required_pull_request_reviews.unwrap();

    assert_eq!(reviews.required_approving_review_count, 2);
    assert!(reviews.require_code_owner_reviews);
    assert_eq!(
        reviews.bypass_pull_request_allowances.unwrap().users,
        vec!["alice", "bob"]
    );
    assert!(request.required_conversation_resolution);
    assert!(!request.enforce_admins);
}

#[test]
fn test_render_codeowners() {
    let owners = vec!["@alice".to_string(), " bob ".to_string(), "".to_string()];
    assert_eq!(render_codeowners(&owners).unwrap(), "* @alice @bob\n");
    assert!(matches!(
        render_codeowners(&[]),
        Err(Error::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_protect_branches_records_per_branch_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/repo-one/branches"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "Develop", "commit": { "sha": "1" } },
            { "name": "main", "commit": { "sha": "2" } }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/repos/acme/repo-one/branches/Develop/protection"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/repo-two/branches"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut plan = BTreeMap::new();
    plan.insert(
        "repo-one".to_string(),
        vec!["develop".to_string(), "release/1.0".to_string()],
    );
    plan.insert("repo-two".to_string(), vec!["develop".to_string()]);

    let client = test_client(&server);
    let outcomes = protect_branches(&client, "acme", &plan, &ProtectionSettings::default())
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].ok);
    assert_eq!(outcomes[0].branch, "Develop");
    assert!(!outcomes[1].ok);
    assert_eq!(outcomes[1].message, "branch not found");
    assert!(!outcomes[2].ok);
    assert_eq!(outcomes[2].repo, "repo-two");

    let table = outcomes_table(&outcomes);
    assert_eq!(table.rows()[0], vec!["repo-one", "Develop", "OK", "protected"]);
}

#[tokio::test]
async fn test_ensure_codeowners_creates_missing_file() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/contents/.github/CODEOWNERS"))
        .and(query_param("ref", "develop"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/repos/acme/widgets/contents/.github/CODEOWNERS"))
        .and(body_json(json!({
            "message": "Add/Update CODEOWNERS for develop",
            "content": "KiBAYWxpY2UK",
            "branch": "develop"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let change = ensure_codeowners(
        &client,
        "acme",
        "widgets",
        "develop",
        &["alice".to_string()],
        DEFAULT_CODEOWNERS_PATH,
    )
    .await
    .unwrap();

    assert_eq!(change, CodeownersChange::Created);
}

#[tokio::test]
async fn test_ensure_codeowners_skips_identical_content() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/contents/.github/CODEOWNERS"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "CODEOWNERS",
            "path": ".github/CODEOWNERS",
            "sha": "old-sha",
            "content": "KiBAYWxp\nY2UK\n",
            "encoding": "base64"
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let change = ensure_codeowners(
        &client,
        "acme",
        "widgets",
        "main",
        &["@alice".to_string()],
        DEFAULT_CODEOWNERS_PATH,
    )
    .await
    .unwrap();

    assert_eq!(change, CodeownersChange::Unchanged);
}

#[tokio::test]
async fn test_ensure_codeowners_updates_with_sha() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/contents/.github/CODEOWNERS"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "CODEOWNERS",
            "path": ".github/CODEOWNERS",
            "sha": "old-sha",
            "content": "KiBAYm9iCg==",
            "encoding": "base64"
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/repos/acme/widgets/contents/.github/CODEOWNERS"))
        .and(body_json(json!({
            "message": "Add/Update CODEOWNERS for main",
            "content": "KiBAYWxpY2UK",
            "branch": "main",
            "sha": "old-sha"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let change = ensure_codeowners(
        &client,
        "acme",
        "widgets",
        "main",
        &["alice".to_string()],
        DEFAULT_CODEOWNERS_PATH,
    )
    .await
    .unwrap();

    assert_eq!(change, CodeownersChange::Updated);
}

#[tokio::test]
async fn test_export_branch_protection_writes_json() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/branches/main/protection"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "enforce_admins": { "enabled": true }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/branches/dev/protection"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let written = export_branch_protection(&client, "acme", "widgets", "main", dir.path())
        .await
        .unwrap()
        .unwrap();
    let missing = export_branch_protection(&client, "acme", "widgets", "dev", dir.path())
        .await
        .unwrap();

    assert_eq!(written, dir.path().join("widgets_main_protection.json"));
    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&written).unwrap()).unwrap();
    assert_eq!(value["enforce_admins"]["enabled"], true);
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_export_rulesets_writes_one_file_each() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/orgs/acme/rulesets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 11, "name": "main-protection" },
            { "id": 12, "name": "gone" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme/rulesets/11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 11, "name": "main-protection", "rules": [{ "type": "deletion" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme/rulesets/12"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let written = export_rulesets(&client, "acme", dir.path()).await.unwrap();

    assert_eq!(written, vec![dir.path().join("ruleset_11.json")]);
}
