//! Command-line behavior and exit codes

mod fixtures;

use std::process::{Command, Output};

use fixtures::chart_dir;
use tempfile::TempDir;

fn svcchart(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_svcchart"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn chart_args<'a>(command: &'a str, chart: &'a str, env: &'a str) -> Vec<&'a str> {
    vec![command, "--quiet", "--chart-dir", chart, "--env", env, "--release", "orders"]
}

#[test]
fn test_render_to_stdout() {
    let chart = chart_dir();
    let output = svcchart(&chart_args("render", chart.to_str().unwrap(), "dev"));

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.matches("---\n").count(), 4);
    assert!(stdout.contains("kind: Deployment"));
    assert!(stdout.contains("name: orders-api-microservice-service"));
}

#[test]
fn test_render_to_out_dir() {
    let chart = chart_dir();
    let out = TempDir::new().unwrap();
    let mut args = chart_args("render", chart.to_str().unwrap(), "prod");
    args.extend(["--out-dir", out.path().to_str().unwrap(), "--output", "json"]);

    let output = svcchart(&args);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert!(out
        .path()
        .join("horizontalpodautoscaler-orders-api-microservice-hpa.json")
        .exists());
}

#[test]
fn test_validation_failure_exit_code() {
    let chart = chart_dir();
    let mut args = chart_args("render", chart.to_str().unwrap(), "dev");
    args.extend(["--set", "containerPort=0,replicaCount=-1"]);

    let output = svcchart(&args);
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty(), "nothing is rendered on validation failure");
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("OUT_OF_RANGE:containerPort"));
    assert!(stderr.contains("OUT_OF_RANGE:replicaCount"));
}

#[test]
fn test_render_failure_exit_code() {
    let chart = chart_dir();
    let mut args = chart_args("render", chart.to_str().unwrap(), "dev");
    args.extend(["--set", "podAntiAffinity.zone.enabled=true,podAntiAffinity.zone.override=true"]);

    let output = svcchart(&args);
    assert_eq!(output.status.code(), Some(3));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("kind: Service"));
    assert!(!stdout.contains("kind: Deployment"));
}

#[test]
fn test_load_failure_exit_code() {
    let chart = chart_dir();
    let output = svcchart(&chart_args("render", chart.to_str().unwrap(), "staging"));
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("values-staging.yaml"));
}

#[test]
fn test_release_is_required() {
    let chart = chart_dir();
    let output = svcchart(&["render", "--quiet", "--chart-dir", chart.to_str().unwrap(), "--env", "dev"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--release"));

    let output = svcchart(&[
        "render",
        "--quiet",
        "--chart-dir",
        chart.to_str().unwrap(),
        "--env",
        "dev",
        "--release",
        " ",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("release name must not be empty"));
}

#[test]
fn test_validate_command() {
    let chart = chart_dir();
    let output = svcchart(&chart_args("validate", chart.to_str().unwrap(), "dev"));
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap().trim(), "valid");

    let output = svcchart(&[
        "validate",
        "--quiet",
        "--chart-dir",
        chart.to_str().unwrap(),
        "--release",
        "orders",
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8(output.stdout)
        .unwrap()
        .contains("MISSING_REQUIRED:environment"));
}

#[test]
fn test_resolve_command_json() {
    let chart = chart_dir();
    let mut args = chart_args("resolve", chart.to_str().unwrap(), "dev");
    args.extend(["-o", "json"]);

    let output = svcchart(&args);
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["schema_id"], "svcchart/resolved_config@1");
    assert_eq!(report["config"]["virtualService"]["effectiveDomain"], "dev.example.com");
    assert_eq!(report["sources"][0]["origin"], "builtin");
}

#[test]
fn test_names_command() {
    let chart = chart_dir();
    let mut args = chart_args("names", chart.to_str().unwrap(), "dev");
    args.extend(["-o", "json"]);

    let output = svcchart(&args);
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["fullname"], "orders-api-microservice");
    assert_eq!(report["selector_labels"]["app.kubernetes.io/instance"], "orders");
}
