#![allow(clippy::unwrap_used, clippy::expect_used)]

//! CLI smoke tests for the hateoas-demo binary.

use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn run_demo(args: &[&str], env: &[(&str, &str)]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hateoas-demo"))
        .args(args)
        .envs(env.iter().copied())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute hateoas-demo")
}

fn write_config(dir: &TempDir, contents: &str) -> String {
    let path = dir.path().join("hateoas.yaml");
    std::fs::write(&path, contents).expect("Failed to write config file");
    path.to_str().unwrap().to_owned()
}

fn printed_config(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "print-config should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("print-config emits JSON")
}

#[test]
fn test_cli_help_command() {
    let output = run_demo(&["--help"], &[]);

    assert!(output.status.success(), "Help command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"), "Should contain usage information");
    assert!(stdout.contains("--config"), "Should mention config option");
    assert!(stdout.contains("--print-config"), "Should mention print-config");
}

#[test]
fn test_cli_version_command() {
    let output = run_demo(&["--version"], &[]);

    assert!(output.status.success(), "Version command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("hateoas-demo"), "Should contain binary name");
}

#[test]
fn test_print_config_defaults() {
    let config = printed_config(&run_demo(&["--print-config"], &[]));

    assert_eq!(config["default_policy"], "on_demand");
    assert_eq!(config["caching"], false);
    assert_eq!(config["cache"]["enabled"], false);
    assert!(config["cache"]["ttl"].is_null());
}

#[test]
fn test_print_config_from_yaml_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(
        &dir,
        r"
default_policy: always
cache:
  enabled: true
  ttl: 90s
directives:
  - scope: group
    group: customers
    policy: on_demand
    caching: true
",
    );

    let config = printed_config(&run_demo(&["--config", &path, "--print-config"], &[]));

    assert_eq!(config["default_policy"], "always");
    assert_eq!(config["cache"]["ttl"], "1m 30s");
    assert_eq!(config["directives"][0]["group"], "customers");
}

#[test]
fn test_env_overrides_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, "default_policy: always\n");

    let output = run_demo(
        &["--config", &path, "--print-config"],
        &[("HATEOAS__DEFAULT_POLICY", "never")],
    );

    assert_eq!(printed_config(&output)["default_policy"], "never");
}

#[test]
fn test_missing_config_file_fails() {
    let output = run_demo(&["--config", "/nonexistent/hateoas.yaml", "--print-config"], &[]);

    assert!(!output.status.success(), "Should fail when config file doesn't exist");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "Should indicate config file not found: {stderr}");
}

#[test]
fn test_caching_without_cache_is_rejected() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, "caching: true\ncache:\n  enabled: false\n");

    let output = run_demo(&["--config", &path, "--print-config"], &[]);

    assert!(!output.status.success(), "Should reject caching without a cache");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no link cache is configured"), "{stderr}");
}

#[test]
fn test_bundled_config_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/hateoas-demo.yaml");
    let config = printed_config(&run_demo(&["--config", path, "--print-config"], &[]));

    assert_eq!(config["cache"]["enabled"], true);
    assert_eq!(config["directives"].as_array().map(Vec::len), Some(2));
}
