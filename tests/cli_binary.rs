#![allow(deprecated)]

/// Binary-level tests for argument parsing, configuration validation and
/// the one-shot `generate` command
use assert_cmd::Command;
use predicates::prelude::*;
mod common;

const FAKE_PROVIDER_CONFIG: &str = "provider:\n  type: fake\nknowledge:\n  enabled: false\n";

fn binary() -> Command {
    let mut cmd = Command::cargo_bin("seo-assistant").unwrap();
    cmd.env_remove("SEO_ASSISTANT_PROVIDER")
        .env_remove("SEO_ASSISTANT_GENERATION_TIMEOUT_SECONDS");
    cmd
}

/// Help lists both subcommands
#[test]
fn test_help_lists_commands() {
    binary()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("generate"));
}

/// Version does not need a configuration
#[test]
fn test_version_succeeds() {
    binary().arg("--version").assert().success();
}

/// Zero generation timeout is rejected before any command runs
#[test]
fn test_invalid_config_zero_timeout() {
    let (_temp_dir, config_path) =
        common::temp_config_file("provider:\n  type: fake\ngeneration:\n  timeout_seconds: 0\n");

    binary()
        .arg("--config")
        .arg(config_path)
        .arg("generate")
        .arg("Write about boots")
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be greater than 0"));
}

/// Unknown provider types are rejected
#[test]
fn test_invalid_config_unknown_provider() {
    let (_temp_dir, config_path) = common::temp_config_file("provider:\n  type: copilot\n");

    binary()
        .arg("--config")
        .arg(config_path)
        .arg("generate")
        .arg("Write about boots")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid provider type"));
}

/// Malformed YAML is reported as a parse failure
#[test]
fn test_invalid_config_unparseable() {
    let (_temp_dir, config_path) = common::temp_config_file("provider: [unclosed\n");

    binary()
        .arg("--config")
        .arg(config_path)
        .arg("generate")
        .arg("Write about boots")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config"));
}

/// Generate prints the validated suggestion as JSON
#[test]
fn test_generate_prints_suggestion_json() {
    let (_temp_dir, config_path) = common::temp_config_file(FAKE_PROVIDER_CONFIG);

    let assert = binary()
        .arg("--config")
        .arg(config_path)
        .arg("generate")
        .arg("Write about boots")
        .arg("--title")
        .arg("Boots")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let output: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(output["suggestion"]["title_tag"], "Generated Title");
    assert!(output["score"].is_u64());
}

/// A blank message is rejected by the generate command
#[test]
fn test_generate_rejects_blank_message() {
    let (_temp_dir, config_path) = common::temp_config_file(FAKE_PROVIDER_CONFIG);

    binary()
        .arg("--config")
        .arg(config_path)
        .arg("generate")
        .arg("   ")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Message must not be empty"));
}
