use super::*;
use tempfile::TempDir;

#[test]
fn test_init_config_writes_defaults_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("org-steward.toml");

    init_config(&path).unwrap();
    assert_eq!(AppConfig::load(&path).unwrap(), AppConfig::default());

    let again = init_config(&path);
    assert!(matches!(again, Err(Error::Config(_))));
}

#[test]
fn test_show_config_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let shown = show_config(&dir.path().join("absent.toml")).unwrap();

    assert!(shown.contains("[github]"));
    assert!(shown.contains("page_size = 100"));
    assert!(shown.contains("[concurrency]"));
}

#[test]
fn test_show_config_reads_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("org-steward.toml");
    std::fs::write(&path, "[github]\norg = \"acme\"\n").unwrap();

    let shown = show_config(&path).unwrap();

    assert!(shown.contains("org = \"acme\""));
}
