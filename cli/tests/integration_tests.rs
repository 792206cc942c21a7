use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

/// Helper to create a temp directory that is cleaned up on drop.
struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("flagtree_cli_test_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("failed to create temp dir");
        Self { path }
    }

    fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// A small deploy tool schema in YAML.
fn write_yaml_schema(dir: &TempDir) -> PathBuf {
    let yaml = r#"name: deploy
description: Deploy a service
long_description: Ships a `service' to a region
options:
  - short: v
    long: verbose
    type: bool
    collection: sequence
    description: Show verbose output
  - long: region
    description: Target region
    default: [eu-west-1]
    env: [FLAGTREE_TEST_REGION]
groups:
  - heading: Network
    namespace: net
    options:
      - long: port
        type: integer
        description: Listen port
positional:
  - name: service
    description: Service to deploy
    required: true
commands:
  - name: rollback
    aliases: [rb]
    description: Roll back the last deploy
    options:
      - short: f
        long: force
        type: bool
        description: Skip confirmation
"#;
    let path = dir.join("deploy.yaml");
    fs::write(&path, yaml).expect("failed to write schema");
    path
}

/// The same kind of schema as JSON.
fn write_json_schema(dir: &TempDir, name: &str) -> PathBuf {
    let json = serde_json::json!({
        "name": name,
        "description": format!("Test schema for {name}"),
        "options": [{"short": "n", "long": "count", "type": "integer"}],
        "positional": [{"name": "files", "multiplicity": "rest"}]
    });
    let path = dir.join(&format!("{name}.json"));
    fs::write(&path, serde_json::to_string_pretty(&json).unwrap()).expect("failed to write schema");
    path
}

fn flagtree(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_flagtree"))
        .args(args)
        .env_remove("FLAGTREE_TEST_REGION")
        .output()
        .expect("failed to run flagtree")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ---------------------------------------------------------------------------
// parse
// ---------------------------------------------------------------------------

#[test]
fn parse_reports_values_as_json() {
    let dir = TempDir::new("parse_json");
    let schema = write_yaml_schema(&dir);

    let output = flagtree(&[
        "parse",
        "--schema",
        schema.to_str().unwrap(),
        "--",
        "-vv",
        "--net.port",
        "8080",
        "api",
        "rb",
        "--force",
        "--",
        "extra",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("invalid JSON");
    assert_eq!(report["commands"], serde_json::json!(["deploy", "rollback"]));
    assert_eq!(report["remaining"], serde_json::json!(["extra"]));

    let root = &report["values"][0];
    assert_eq!(root["command"], "deploy");
    assert_eq!(root["options"]["verbose"], serde_json::json!([true, true]));
    assert_eq!(root["options"]["net.port"], 8080);
    assert_eq!(root["options"]["region"], "eu-west-1");
    assert_eq!(root["arguments"]["service"], "api");

    let child = &report["values"][1];
    assert_eq!(child["command"], "rollback");
    assert_eq!(child["options"]["force"], true);
}

#[test]
fn parse_json_schema_with_yaml_report() {
    let dir = TempDir::new("parse_env");
    let schema = write_json_schema(&dir, "files");

    let output = flagtree(&[
        "parse",
        "--schema",
        schema.to_str().unwrap(),
        "--format",
        "yaml",
        "--",
        "-n",
        "3",
        "a",
        "b",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report: serde_yaml::Value = serde_yaml::from_str(&stdout(&output)).expect("invalid YAML");
    let values = &report["values"][0];
    assert_eq!(values["options"]["count"].as_i64(), Some(3));
    assert_eq!(values["arguments"]["files"].as_sequence().map(Vec::len), Some(2));
    assert_eq!(values["arguments"]["files"][1].as_str(), Some("b"));
}

#[test]
fn parse_prefers_default_over_environment() {
    let dir = TempDir::new("parse_env_var");
    let schema = write_yaml_schema(&dir);

    let output = Command::new(env!("CARGO_BIN_EXE_flagtree"))
        .args(["parse", "--schema", schema.to_str().unwrap(), "--", "api"])
        .env("FLAGTREE_TEST_REGION", "us-east-2")
        .output()
        .expect("failed to run flagtree");
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    // Declared defaults are applied before environment values.
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["values"][0]["options"]["region"], "eu-west-1");
}

#[test]
fn parse_help_prints_to_stdout_and_succeeds() {
    let dir = TempDir::new("parse_help");
    let schema = write_yaml_schema(&dir);

    let output = flagtree(&["parse", "--schema", schema.to_str().unwrap(), "--", "--help"]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.starts_with("Usage:\n  deploy [OPTIONS] service <command>\n"), "{text}");
    assert!(text.contains("\nNetwork:\n"));
    assert!(text.contains("--net.port="));
    assert!(text.contains("Target region (eu-west-1) [FLAGTREE_TEST_REGION]"));
    assert!(text.contains("  rollback  Roll back the last deploy (aliases: rb)\n"));
}

#[test]
fn parse_unknown_flag_fails() {
    let dir = TempDir::new("parse_unknown");
    let schema = write_yaml_schema(&dir);

    let output = flagtree(&["parse", "--schema", schema.to_str().unwrap(), "--", "--bogus"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("error: unknown flag `bogus'"), "{}", stderr(&output));
    assert!(stdout(&output).is_empty());
}

#[test]
fn parse_missing_required_argument_fails() {
    let dir = TempDir::new("parse_required");
    let schema = write_yaml_schema(&dir);

    let output = flagtree(&["parse", "--schema", schema.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("the required argument `service' was not provided"));
}

#[test]
fn parse_windows_convention() {
    let dir = TempDir::new("parse_windows");
    let schema = write_yaml_schema(&dir);

    let output = flagtree(&[
        "parse",
        "--schema",
        schema.to_str().unwrap(),
        "--windows",
        "--",
        "/region:ap-south-1",
        "api",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["values"][0]["options"]["region"], "ap-south-1");
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

#[test]
fn help_for_subcommand_path() {
    let dir = TempDir::new("help_path");
    let schema = write_yaml_schema(&dir);

    let output = flagtree(&["help", "--schema", schema.to_str().unwrap(), "svc", "rollback"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = stdout(&output);
    assert!(text.starts_with("Usage:\n  deploy [OPTIONS] service rollback [rollback-OPTIONS]\n"), "{text}");
    assert!(text.contains("[rollback command options]"));
    assert!(text.contains("--force"));
    assert!(!text.contains("Available commands:"));
}

// ---------------------------------------------------------------------------
// man
// ---------------------------------------------------------------------------

#[test]
fn man_uses_requested_date() {
    let dir = TempDir::new("man_date");
    let schema = write_yaml_schema(&dir);

    let output = flagtree(&["man", "--schema", schema.to_str().unwrap(), "--date", "2024-03-05"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let page = stdout(&output);
    assert!(page.starts_with(".TH deploy 1 \"5 March 2024\"\n.SH NAME\ndeploy \\- Deploy a service\n"));
    assert!(page.contains("Ships a \\fBservice\\fP to a region"));
    assert!(page.contains(".TP\n\\fB--net.port\\fP\nListen port\n"));
    assert!(page.contains(".SS rollback\n"));
    assert!(page.contains("\\fBAliases\\fP: rb"));
}

#[test]
fn man_rejects_bad_date() {
    let dir = TempDir::new("man_bad_date");
    let schema = write_yaml_schema(&dir);

    let output = flagtree(&["man", "--schema", schema.to_str().unwrap(), "--date", "05/03/2024"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("invalid --date"));
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[test]
fn validate_accepts_yaml_and_json() {
    let dir = TempDir::new("validate_ok");
    let yaml = write_yaml_schema(&dir);
    let json = write_json_schema(&dir, "files");

    let output = flagtree(&["validate", yaml.to_str().unwrap(), json.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "Validated 2 schema file(s): deploy, files.");
}

#[test]
fn validate_reports_duplicate_names() {
    let dir = TempDir::new("validate_dup");
    let path = dir.join("dup.yaml");
    fs::write(
        &path,
        "name: dup\noptions:\n  - long: name\n  - long: name\n",
    )
    .unwrap();

    let output = flagtree(&["validate", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("dup.yaml"), "{err}");
    assert!(err.contains("name"), "{err}");
}

#[test]
fn validate_reports_unreadable_file() {
    let dir = TempDir::new("validate_missing");
    let path = dir.join("missing.yaml");

    let output = flagtree(&["validate", path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("failed to load"));
}
