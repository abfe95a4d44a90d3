//! End-to-end tests for the logtriage binary
//!
//! Uses pattern-only configurations so nothing touches the network.

use std::path::Path;
use std::process::{Command, Output};

const PATTERN_ONLY: &str = r#"
routing:
  legacy_sources: []
  default_route: [pattern]
patterns:
  rules:
    - label: User Action
      pattern: 'User User\d+ logged (in|out)\.'
    - label: HTTP Status
      pattern: "404"
      kind: literal
"#;

fn logtriage(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_logtriage"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("LOGTRIAGE_CONFIG")
        .args(args)
        .output()
        .expect("failed to run logtriage")
}

#[test]
fn test_classify_csv() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("logtriage.yaml"), PATTERN_ONLY).unwrap();
    std::fs::write(
        dir.path().join("in.csv"),
        "source,log_message\n\
         ModernCRM,User User42 logged out.\n\
         WebServer,GET /missing 404\n\
         BillingSystem,Invoice 17 reconciled\n",
    )
    .unwrap();

    let output = logtriage(dir.path(), &["classify", "-i", "in.csv", "-o", "out.csv", "--concurrency", "2"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let written = std::fs::read_to_string(dir.path().join("out.csv")).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines[0], "source,log_message,target_label,confidence,error");
    assert_eq!(lines[1], "ModernCRM,User User42 logged out.,User Action,1.0000,");
    assert_eq!(lines[2], "WebServer,GET /missing 404,HTTP Status,1.0000,");
    assert_eq!(lines[3], "BillingSystem,Invoice 17 reconciled,Unclassified,0.0000,");
}

#[test]
fn test_classify_writes_metrics() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("logtriage.yaml"), PATTERN_ONLY).unwrap();
    std::fs::write(dir.path().join("in.csv"), "source,log_message\nA,GET / 404\n").unwrap();

    let output = logtriage(
        dir.path(),
        &["classify", "-i", "in.csv", "-o", "out.csv", "--metrics-out", "metrics.prom"],
    );
    assert!(output.status.success());

    let metrics = std::fs::read_to_string(dir.path().join("metrics.prom")).unwrap();
    assert!(metrics.contains("logtriage_records_total"));
}

#[test]
fn test_route_prints_decision() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("logtriage.yaml"), PATTERN_ONLY).unwrap();

    let output = logtriage(dir.path(), &["route", "-s", "ModernCRM", "-m", "User User7 logged in."]);
    assert!(output.status.success());

    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["result"]["label"], "User Action");
    assert_eq!(body["decision"]["resolved_by"], "pattern");
    assert_eq!(body["decision"]["attempts"][0]["outcome"]["outcome"], "accepted");
}

#[test]
fn test_check_config() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("logtriage.yaml"), PATTERN_ONLY).unwrap();

    let output = logtriage(dir.path(), &["check-config"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("pattern"));
}

#[test]
fn test_bad_config_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("broken.yaml"),
        "routing:\n  legacy_sources: []\n  default_route: [pattern, semantic]\nsemantic:\n  artifact: missing.json\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("in.csv"), "source,log_message\nA,b\n").unwrap();

    let output = logtriage(
        dir.path(),
        &["--config", "broken.yaml", "classify", "-i", "in.csv", "-o", "out.csv"],
    );
    assert!(!output.status.success());
    assert!(!dir.path().join("out.csv").exists());
}

#[test]
fn test_missing_input_column_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("logtriage.yaml"), PATTERN_ONLY).unwrap();
    std::fs::write(dir.path().join("in.csv"), "source,text\nA,b\n").unwrap();

    let output = logtriage(dir.path(), &["classify", "-i", "in.csv", "-o", "out.csv"]);
    assert!(!output.status.success());
}
