use super::*;
use crate::config::AppConfig;
use secrecy::ExposeSecret;
use serial_test::serial;
use std::path::Path;

fn context(storage_url: Option<&str>) -> Context {
    let mut config = AppConfig::default();
    config.github.org = "acme".to_string();
    config.backup.storage_url = storage_url.map(str::to_string);
    config.backup.batch_pause_secs = 10;
    Context::new(config, PathBuf::from("org-steward.toml"), None, Some(3))
}

#[test]
#[serial]
fn test_backup_options_without_storage_keep_archives_local() {
    std::env::remove_var(AZURE_SAS_TOKEN_ENV_VAR);
    let options = backup_options(&context(None), None, false).unwrap();

    assert!(options.upload.is_none());
    assert_eq!(options.output_root, Path::new("backups"));
    assert_eq!(options.web_base.as_str(), "https://github.com/");
    assert_eq!(options.workers, 3);
    assert_eq!(options.batch_pause, Duration::from_secs(10));
}

#[test]
#[serial]
fn test_backup_options_upload_requires_sas_token() {
    std::env::remove_var(AZURE_SAS_TOKEN_ENV_VAR);
    let ctx = context(Some("https://acct.blob.core.windows.net/backups"));

    assert!(matches!(
        backup_options(&ctx, None, false),
        Err(Error::Auth(_))
    ));

    std::env::set_var(AZURE_SAS_TOKEN_ENV_VAR, "sv=2024&sig=abc");
    let options = backup_options(&ctx, Some(PathBuf::from("/tmp/out")), false).unwrap();
    std::env::remove_var(AZURE_SAS_TOKEN_ENV_VAR);

    let upload = options.upload.unwrap();
    assert_eq!(upload.sas_token.expose_secret(), "sv=2024&sig=abc");
    assert_eq!(upload.program, Path::new("azcopy"));
    assert_eq!(options.output_root, Path::new("/tmp/out"));
}

#[test]
#[serial]
fn test_backup_options_no_upload_skips_sas_token() {
    std::env::remove_var(AZURE_SAS_TOKEN_ENV_VAR);
    let ctx = context(Some("https://acct.blob.core.windows.net/backups"));

    let options = backup_options(&ctx, None, true).unwrap();

    assert!(options.upload.is_none());
}
