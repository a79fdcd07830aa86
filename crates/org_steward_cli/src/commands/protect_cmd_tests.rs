use super::*;
use clap::Parser;

#[derive(Parser, Debug)]
struct Harness {
    #[command(subcommand)]
    cmd: ProtectCommands,
}

#[test]
fn test_default_rules_match_default_settings() {
    let parsed = Harness::try_parse_from(["test", "branches", "--plan", "plan.csv"]).unwrap();
    let ProtectCommands::Branches { rules, .. } = parsed.cmd else {
        panic!("expected branches");
    };
    assert_eq!(rules.to_settings(), ProtectionSettings::default());
}

#[test]
fn test_rule_flags_map_to_settings() {
    let parsed = Harness::try_parse_from([
        "test",
        "branches",
        "--plan",
        "plan.csv",
        "--approvals",
        "2",
        "--enforce-admins",
        "--no-code-owner-reviews",
        "--bypass-user",
        "release-bot",
        "--bypass-user",
        "alice",
    ])
    .unwrap();
    let ProtectCommands::Branches { rules, .. } = parsed.cmd else {
        panic!("expected branches");
    };
    let settings = rules.to_settings();

    assert_eq!(settings.required_approvals, 2);
    assert!(settings.enforce_admins);
    assert!(!settings.require_code_owner_reviews);
    assert!(settings.require_conversation_resolution);
    assert_eq!(settings.bypass_users, vec!["release-bot", "alice"]);
}

#[test]
fn test_codeowners_owners_are_comma_separated() {
    let parsed = Harness::try_parse_from([
        "test",
        "codeowners",
        "--repo",
        "widgets",
        "--owners",
        "alice,@acme/devs",
    ])
    .unwrap();
    let ProtectCommands::Codeowners {
        owners,
        branch,
        path,
        ..
    } = parsed.cmd
    else {
        panic!("expected codeowners");
    };
    assert_eq!(owners, vec!["alice", "@acme/devs"]);
    assert_eq!(branch, None);
    assert_eq!(path, DEFAULT_CODEOWNERS_PATH);
}

#[test]
fn test_codeowners_requires_owners() {
    let result = Harness::try_parse_from(["test", "codeowners", "--repo", "widgets"]);
    assert!(result.is_err());
}
