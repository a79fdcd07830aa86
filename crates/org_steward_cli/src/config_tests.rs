use super::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_app_config_default() {
    let config = AppConfig::default();

    assert_eq!(config.authentication.auth_method, "token");
    assert_eq!(config.github.page_size, 100);
    assert_eq!(config.github.web_url, "https://github.com/");
    assert_eq!(config.concurrency.workers, 8);
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.backup.clone_attempts, 3);
    assert_eq!(config.backup.batch_pause_secs, 300);
    assert!(!config.teamcity.accept_invalid_certs);
}

#[test]
fn test_app_config_load_partial_file_keeps_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("org-steward.toml");
    fs::write(
        &config_path,
        r#"
[github]
org = "acme"

[teamcity]
url = "https://tc.example.com"
accept_invalid_certs = true

[backup]
storage_url = "https://acct.blob.core.windows.net/backups"
"#,
    )
    .expect("Failed to write config");

    let config = AppConfig::load(&config_path).expect("Failed to load config");

    assert_eq!(config.github.org, "acme");
    assert_eq!(config.github.page_size, 100);
    assert_eq!(config.teamcity.url.as_deref(), Some("https://tc.example.com"));
    assert!(config.teamcity.accept_invalid_certs);
    assert_eq!(config.backup.azcopy_path, PathBuf::from("azcopy"));
    assert_eq!(config.concurrency.workers, 8);
}

#[test]
fn test_app_config_load_invalid_toml() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("invalid_config.toml");

    fs::write(&config_path, "invalid = toml = syntax").expect("Failed to write invalid TOML");

    let result = AppConfig::load(&config_path);

    if let Err(Error::Config(msg)) = result {
        assert!(msg.contains("Failed to parse configuration file"));
    } else {
        panic!("Expected Config error");
    }
}

#[test]
fn test_app_config_load_nonexistent_file() {
    let nonexistent_path = PathBuf::from("nonexistent_config.toml");

    let result = AppConfig::load(&nonexistent_path);
    if let Err(Error::Config(msg)) = result {
        assert!(msg.contains("Configuration file not found"));
    } else {
        panic!("Expected Config error");
    }

    let config = AppConfig::load_or_default(&nonexistent_path).expect("defaults");
    assert_eq!(config, AppConfig::default());
}

#[test]
fn test_app_config_save_and_load() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("org-steward.toml");

    let mut original = AppConfig::default();
    original.github.org = "acme".to_string();
    original.authentication.auth_method = "app".to_string();
    original.backup.storage_url = Some("https://acct.blob.core.windows.net/b".to_string());

    original.save(&config_path).expect("Failed to save config");
    let loaded = AppConfig::load(&config_path).expect("Failed to load config");

    assert_eq!(loaded, original);
}

#[test]
fn test_retry_config_to_policy() {
    let retry = RetryConfig {
        max_attempts: 0,
        base_delay_ms: 250,
        max_delay_secs: 10,
        max_rate_limit_wait_secs: 30,
    };

    let policy = retry.to_policy();

    assert_eq!(policy.max_attempts, 1);
    assert_eq!(policy.base_delay, Duration::from_millis(250));
    assert_eq!(policy.max_delay, Duration::from_secs(10));
    assert_eq!(policy.max_rate_limit_wait, Duration::from_secs(30));
}

#[test]
fn test_get_config_path_with_provided_path() {
    let custom_path = "/custom/path/org-steward.toml";
    let result = get_config_path(Some(custom_path));
    assert_eq!(result, PathBuf::from(custom_path));
}

#[test]
fn test_get_config_path_with_none() {
    let result = get_config_path(None);
    assert!(result.ends_with(DEFAULT_CONFIG_FILENAME));
}
