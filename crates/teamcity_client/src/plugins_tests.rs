use super::*;
use std::fs;

const FULL_DESCRIPTOR: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<teamcity-plugin xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <info>
    <name>slack-notifier</name>
    <display-name>Slack Notifier</display-name>
    <version>1.4</version>
    <vendor>
      <name>JetBrains</name>
      <url>https://www.jetbrains.com</url>
    </vendor>
  </info>
  <requirements>
    <teamcity>2023.05, 2023.11</teamcity>
  </requirements>
</teamcity-plugin>"#;

#[test]
fn test_parse_full_descriptor() {
    let descriptor = parse_descriptor(FULL_DESCRIPTOR, "dir-name", Path::new("/p/slack"));

    assert_eq!(descriptor.name, "slack-notifier");
    assert_eq!(descriptor.vendor, "JetBrains");
    assert_eq!(descriptor.compatible_versions, "2023.05, 2023.11");
}

#[test]
fn test_parse_descriptor_with_build_attributes_and_text_vendor() {
    let xml = r#"<teamcity-plugin>
      <info><vendor>Acme Tools</vendor></info>
      <requirements min-build="129000" />
    </teamcity-plugin>"#;

    let descriptor = parse_descriptor(xml, "acme-plugin", Path::new("/p/acme"));

    assert_eq!(descriptor.name, "acme-plugin");
    assert_eq!(descriptor.vendor, "Acme Tools");
    assert_eq!(descriptor.compatible_versions, "min-build=129000");
}

#[test]
fn test_parse_descriptor_without_root_is_parse_error() {
    let descriptor = parse_descriptor("garbage", "broken", Path::new("/p/broken"));

    assert_eq!(descriptor.name, "broken");
    assert_eq!(descriptor.vendor, "Parse Error");
}

#[test]
fn test_parse_descriptor_defaults_to_unknown() {
    let descriptor = parse_descriptor("<teamcity-plugin></teamcity-plugin>", "bare", Path::new("/p"));

    assert_eq!(descriptor.vendor, "Unknown");
    assert_eq!(descriptor.compatible_versions, "Unknown");
}

#[test]
fn test_compatibility_verdicts() {
    assert_eq!(compatibility("2023.05, 2023.11", "2023.11"), Compatibility::Yes);
    assert_eq!(compatibility("2022.10", "2023.11"), Compatibility::No);
    assert_eq!(compatibility("Unknown", "2023.11"), Compatibility::Unknown);
    assert_eq!(compatibility("", "2023.11"), Compatibility::Unknown);
    assert_eq!(Compatibility::Yes.to_string(), "Yes");
}

#[test]
fn test_scan_plugin_dir_lists_dirs_and_zips() {
    let dir = tempfile::tempdir().unwrap();
    let plugin = dir.path().join("slack");
    fs::create_dir(&plugin).unwrap();
    fs::write(plugin.join(DESCRIPTOR_FILE_NAME), FULL_DESCRIPTOR).unwrap();
    fs::create_dir(dir.path().join("no-descriptor")).unwrap();
    fs::write(dir.path().join("custom.zip"), b"PK").unwrap();
    fs::write(dir.path().join("notes.txt"), b"ignore").unwrap();

    let scan = scan_plugin_dir(dir.path()).unwrap();

    assert_eq!(scan.installed, vec!["custom.zip", "no-descriptor", "slack"]);
    assert_eq!(scan.descriptors.len(), 1);
    assert_eq!(scan.descriptors[0].name, "slack-notifier");
}

#[test]
fn test_scan_missing_dir_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = scan_plugin_dir(&dir.path().join("absent"));

    assert!(matches!(result, Err(Error::PluginDir { .. })));
}
