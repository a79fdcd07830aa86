use super::*;
use auth_handler::GitHubAuthService;
use secrecy::SecretString;

fn authenticators() -> Vec<Box<dyn InstallationAuthenticator>> {
    [(11, "App1"), (22, "App2")]
        .into_iter()
        .map(|(id, label)| {
            Box::new(
                GitHubAuthService::new(id, SecretString::from("unused".to_string()))
                    .with_label(label),
            ) as Box<dyn InstallationAuthenticator>
        })
        .collect()
}

#[test]
fn test_select_app_defaults_to_first() {
    let apps = authenticators();
    assert_eq!(select_app(&apps, None).unwrap().label(), "App1");
}

#[test]
fn test_select_app_by_label_ignores_case() {
    let apps = authenticators();
    assert_eq!(select_app(&apps, Some("app2")).unwrap().label(), "App2");
}

#[test]
fn test_select_app_unknown_label() {
    let apps = authenticators();
    assert!(matches!(
        select_app(&apps, Some("App9")),
        Err(Error::InvalidArguments(_))
    ));
    assert!(matches!(select_app(&[], None), Err(Error::InvalidArguments(_))));
}
