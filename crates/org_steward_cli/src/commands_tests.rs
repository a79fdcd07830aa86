use super::*;
use chrono::TimeZone;

fn context(org: Option<&str>, workers: Option<usize>) -> Context {
    let mut config = AppConfig::default();
    config.github.org = "configured".to_string();
    Context::new(
        config,
        PathBuf::from("org-steward.toml"),
        org.map(str::to_string),
        workers,
    )
}

#[test]
fn test_context_applies_overrides() {
    let ctx = context(Some("acme"), Some(0));
    assert_eq!(ctx.org().unwrap(), "acme");
    assert_eq!(ctx.workers, 1);

    let ctx = context(None, None);
    assert_eq!(ctx.org().unwrap(), "configured");
    assert_eq!(ctx.workers, 8);
}

#[test]
fn test_context_requires_org() {
    let ctx = Context::new(AppConfig::default(), PathBuf::new(), None, None);
    assert!(matches!(ctx.org(), Err(Error::InvalidArguments(_))));
}

#[test]
fn test_web_base_gets_trailing_slash() {
    let mut ctx = context(None, None);
    ctx.config.github.web_url = "https://ghe.example.com/git".to_string();
    assert_eq!(ctx.web_base().unwrap().as_str(), "https://ghe.example.com/git/");

    ctx.config.github.web_url = "not a url".to_string();
    assert!(matches!(ctx.web_base(), Err(Error::Config(_))));
}

#[test]
fn test_output_path_defaults_to_timestamped_name() {
    assert_eq!(
        output_path(Some(PathBuf::from("out.csv")), "x", "csv"),
        PathBuf::from("out.csv")
    );
    let generated = output_path(None, "archived_repos", "csv");
    let name = generated.to_string_lossy();
    assert!(name.starts_with("archived_repos_"));
    assert!(name.ends_with(".csv"));
}

#[test]
fn test_cutoff_from_days() {
    let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
    assert_eq!(
        cutoff_from_days(365, now),
        Utc.with_ymd_and_hms(2023, 3, 11, 12, 0, 0).unwrap()
    );
}

#[test]
fn test_split_repository() {
    assert_eq!(split_repository("widgets", "acme"), ("acme", "widgets"));
    assert_eq!(split_repository("other/widgets", "acme"), ("other", "widgets"));
    assert_eq!(split_repository("/widgets", "acme"), ("acme", "/widgets"));
}
