//! Binary behaviour tests.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const DOCUMENT: &str = "\
.paramstack-config:
  invalidations:
    shipping-labels: !ecs-invalidation
      cluster_name: acme
      service_name: shipping-labels
      role_name: arn:aws:iam::123456789012:role/restarter
acme:
  ? !item {key: shipping-labels-service, invalidates: [shipping-labels]}
  :
    greeting: hello world
    whitelist-users: [coyote, roadrunner]
";

fn paramstack(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("paramstack").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env_remove("PARAMSTACK_DESCRIPTION")
        .env_remove("PARAMSTACK_FORMAT")
        .env_remove("PARAMSTACK_ECS_RESTART_TIMEOUT")
        .env_remove("PARAMSTACK_TIMESTAMP");
    cmd
}

fn workspace(document: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("config.yaml"), document).unwrap();
    dir
}

#[test]
fn converts_stdin_to_stdout() {
    let dir = TempDir::new().unwrap();
    paramstack(&dir)
        .write_stdin(DOCUMENT)
        .assert()
        .success()
        .stdout(predicate::str::contains("AWSTemplateFormatVersion"))
        .stdout(predicate::str::contains("/acme/shipping-labels-service/greeting"))
        .stdout(predicate::str::contains("Custom::RestartEcsService"));
}

#[test]
fn writes_output_file() {
    let dir = workspace(DOCUMENT);
    paramstack(&dir)
        .args(["config.yaml", "template.json", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let text = fs::read_to_string(dir.path().join("template.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        value["Resources"]["SSMParamAcmeShippingLabelsServiceWhitelistUsers"]["Properties"]["Type"],
        "StringList"
    );
}

#[test]
fn unknown_target_fails_without_output() {
    let dir = workspace(
        "\
acme:
  ? !item {key: svc, invalidates: [ghost]}
  :
    value: 1
",
    );
    paramstack(&dir)
        .args(["config.yaml", "template.yaml"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error [UnknownTargetError]"))
        .stderr(predicate::str::contains("ghost"));

    assert!(!dir.path().join("template.yaml").exists());
}

#[test]
fn missing_input_is_reported() {
    let dir = TempDir::new().unwrap();
    paramstack(&dir)
        .arg("absent.yaml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error [FileNotFound]"));
}

#[test]
fn check_writes_nothing() {
    let dir = workspace(DOCUMENT);
    paramstack(&dir)
        .args(["config.yaml", "template.yaml", "--check"])
        .assert()
        .success();

    assert!(!dir.path().join("template.yaml").exists());
}

#[test]
fn cli_directive_tags_every_parameter() {
    let dir = workspace("app:\n  a: 1\n  b: [x, y]\n");
    paramstack(&dir)
        .args([
            "config.yaml",
            "--invalidate-lambda",
            "function_name=worker,role_import=restarter-role",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("InvalidateCliLambda1Replacer"))
        .stdout(predicate::str::contains("Fn::ImportValue"));
}

#[test]
fn malformed_directive_is_descriptor_error() {
    let dir = workspace("app:\n  a: 1\n");
    paramstack(&dir)
        .args(["config.yaml", "--invalidate-ecs", "cluster_name=acme"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error [DescriptorError]"))
        .stderr(predicate::str::contains("cli-ecs-1"));
}

#[test]
fn summary_goes_to_stderr() {
    let dir = workspace(DOCUMENT);
    paramstack(&dir)
        .args(["config.yaml", "--summary", "--summary-format", "json"])
        .assert()
        .success()
        .stderr(predicate::str::contains("\"target\": \"shipping-labels\""))
        .stdout(predicate::str::contains("\"target\"").not());
}

#[test]
fn dotenv_next_to_input_sets_format() {
    let dir = workspace(DOCUMENT);
    fs::write(dir.path().join(".env"), "PARAMSTACK_FORMAT=json\n").unwrap();
    paramstack(&dir)
        .arg("config.yaml")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{"));
}

#[test]
fn out_of_range_timeout_is_settings_error() {
    let dir = workspace(DOCUMENT);
    paramstack(&dir)
        .args(["config.yaml", "--ecs-restart-timeout", "900"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error [SettingsError]"));
}

#[test]
fn environment_overrides_description() {
    let dir = workspace(DOCUMENT);
    paramstack(&dir)
        .arg("config.yaml")
        .env("PARAMSTACK_DESCRIPTION", "Shipping settings")
        .assert()
        .success()
        .stdout(predicate::str::contains("Description: Shipping settings"));
}

#[test]
fn parse_error_names_the_file() {
    let dir = workspace("a: [unclosed\n");
    paramstack(&dir)
        .arg("config.yaml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error [ParseError]"))
        .stderr(predicate::str::contains("config.yaml"));
}

#[test]
fn unknown_tag_on_empty_mapping_fails() {
    let dir = workspace(
        "\
acme:
  ? !item {key: svc, invalidates: [ghost]}
  : {}
  other: 1
",
    );
    paramstack(&dir)
        .arg("config.yaml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error [UnknownTargetError]"))
        .stdout(predicate::str::is_empty());
}

#[test]
fn empty_text_value_fails() {
    let dir = workspace("acme:\n  greeting: ''\n  users: [a, '']\n");
    paramstack(&dir)
        .arg("config.yaml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error [StructureError]"))
        .stderr(predicate::str::contains("acme/greeting"));
}
