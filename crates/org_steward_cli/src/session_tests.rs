use super::*;
use secrecy::ExposeSecret;
use serial_test::serial;

#[test]
fn test_token_from_sources_prefers_environment() {
    let token = token_from_sources(Some(" env-token ".to_string()), || {
        panic!("keyring must not be read when the environment has a token")
    })
    .unwrap();
    assert_eq!(token.expose_secret(), "env-token");
}

#[test]
fn test_token_from_sources_falls_back_to_keyring() {
    let token = token_from_sources(Some("  ".to_string()), || Some("stored".to_string())).unwrap();
    assert_eq!(token.expose_secret(), "stored");

    assert!(token_from_sources(None, || None).is_none());
}

#[test]
#[serial]
fn test_env_secret_requires_value() {
    std::env::remove_var("ORG_STEWARD_TEST_SECRET");
    assert!(matches!(
        env_secret("ORG_STEWARD_TEST_SECRET"),
        Err(Error::Auth(_))
    ));

    std::env::set_var("ORG_STEWARD_TEST_SECRET", "s3cret");
    let secret = env_secret("ORG_STEWARD_TEST_SECRET").unwrap();
    assert_eq!(secret.expose_secret(), "s3cret");
    std::env::remove_var("ORG_STEWARD_TEST_SECRET");
}

#[test]
#[serial]
fn test_teamcity_requires_url_and_token() {
    let mut config = AppConfig::default();
    assert!(matches!(teamcity(&config), Err(Error::Config(_))));

    config.teamcity.url = Some("https://tc.example.com".to_string());
    std::env::remove_var(TEAMCITY_TOKEN_ENV_VAR);
    assert!(matches!(teamcity(&config), Err(Error::Auth(_))));

    std::env::set_var(TEAMCITY_TOKEN_ENV_VAR, "tc-token");
    assert!(teamcity(&config).is_ok());
    std::env::remove_var(TEAMCITY_TOKEN_ENV_VAR);
}

#[tokio::test]
#[serial]
async fn test_connect_rejects_unknown_auth_method() {
    let mut config = AppConfig::default();
    config.authentication.auth_method = "password".to_string();

    let result = connect(&config, "acme").await;

    assert!(matches!(result, Err(Error::Config(_))));
}

#[tokio::test]
#[serial]
async fn test_connect_with_environment_token() {
    std::env::set_var(TOKEN_ENV_VAR, "ghp_test");
    let config = AppConfig::default();

    let session = connect(&config, "acme").await.unwrap();

    assert_eq!(session.git_token.expose_secret(), "ghp_test");
    std::env::remove_var(TOKEN_ENV_VAR);
}
