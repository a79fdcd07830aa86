use super::*;

#[test]
fn test_auth_error_display() {
    let error = Error::Auth("Invalid token".to_string());
    assert_eq!(error.to_string(), "Authentication error: Invalid token");
}

#[test]
fn test_config_error_display() {
    let error = Error::Config("Missing field 'org'".to_string());
    assert_eq!(error.to_string(), "Configuration error: Missing field 'org'");
}

#[test]
fn test_error_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Error>();
}

#[test]
fn test_configuration_problems_exit_with_two() {
    assert_eq!(Error::Auth("x".into()).exit_code(), EXIT_CONFIGURATION);
    assert_eq!(Error::Config("x".into()).exit_code(), EXIT_CONFIGURATION);
    assert_eq!(
        Error::InvalidArguments("x".into()).exit_code(),
        EXIT_CONFIGURATION
    );

    let rejected: Error = github_client::Error::AuthError("bad credentials".into()).into();
    assert_eq!(rejected.exit_code(), EXIT_CONFIGURATION);

    let bad_url: Error = teamcity_client::Error::InvalidUrl("nope".into()).into();
    assert_eq!(bad_url.exit_code(), EXIT_CONFIGURATION);
}

#[test]
fn test_operation_failures_exit_with_one() {
    let missing = Error::Operation(org_steward_core::Error::InvalidInput("empty list".into()));
    assert_eq!(missing.exit_code(), EXIT_OPERATION_FAILED);

    let not_found: Error = github_client::Error::NotFound.into();
    assert_eq!(not_found.exit_code(), EXIT_OPERATION_FAILED);

    let io = Error::Io(io::Error::new(io::ErrorKind::NotFound, "gone"));
    assert_eq!(io.exit_code(), EXIT_OPERATION_FAILED);
}

#[test]
fn test_auth_handler_errors_become_auth() {
    let error: Error = auth_handler::AuthError::MissingCredentials("GITHUB_TOKEN".into()).into();
    assert!(matches!(error, Error::Auth(_)));
    assert_eq!(error.exit_code(), EXIT_CONFIGURATION);
}
