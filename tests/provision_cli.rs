//! End-to-end runs of `vprov` against a local state file.

mod common;

use common::{run_vprov, write_input};
use serde_json::Value;

const SCENARIO: &str = "id,name,parentId\n1,Root,\n2,Child,1\n3,Orphan,99\n4,Self,4\n5,CON,\n";

fn view_names(report: &Value) -> Vec<String> {
    report["views"]
        .as_array()
        .expect("views array")
        .iter()
        .map(|view| view["name"].as_str().expect("view name").to_string())
        .collect()
}

#[test]
fn provision_twice_reuses_every_view() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let input = write_input(temp_dir.path(), SCENARIO);
    let state = temp_dir.path().join("state.json");
    let args = [
        "provision",
        "--input",
        input.to_str().expect("utf-8 path"),
        "--state",
        state.to_str().expect("utf-8 path"),
        "--json",
    ];

    let first = run_vprov(&args);
    assert!(first.success, "first run failed: {}", first.stderr);
    let report: Value = serde_json::from_str(&first.stdout).expect("parse first report");
    assert_eq!(view_names(&report), vec!["Root", "Child", "Self"]);
    assert_eq!(report["created"], 3);
    assert_eq!(report["orphans"], 1);
    assert_eq!(report["skipped_records"], 1);

    let second = run_vprov(&args);
    assert!(second.success, "second run failed: {}", second.stderr);
    let report: Value = serde_json::from_str(&second.stdout).expect("parse second report");
    assert_eq!(report["created"], 0);
    assert_eq!(report["existing"], 3);
}

#[test]
fn report_file_matches_stdout_summary() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let input = write_input(temp_dir.path(), SCENARIO);
    let state = temp_dir.path().join("state.json");
    let report_path = temp_dir.path().join("report.json");

    let output = run_vprov(&[
        "provision",
        "--input",
        input.to_str().expect("utf-8 path"),
        "--state",
        state.to_str().expect("utf-8 path"),
        "--report",
        report_path.to_str().expect("utf-8 path"),
    ]);
    assert!(output.success, "run failed: {}", output.stderr);
    assert!(output
        .stdout
        .contains("provisioned 3 views (created 3, existing 0, cached 0)"));

    let content = std::fs::read_to_string(&report_path).expect("read report");
    let report: Value = serde_json::from_str(&content).expect("parse report");
    let child = &report["views"][1];
    assert_eq!(child["name"], "Child");
    assert_eq!(child["parent_view_id"], report["views"][0]["view_id"]);
}

#[test]
fn plan_prints_tree_without_touching_state() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let input = write_input(temp_dir.path(), SCENARIO);

    let output = run_vprov(&["plan", "--input", input.to_str().expect("utf-8 path")]);
    assert!(output.success, "plan failed: {}", output.stderr);
    let lines: Vec<&str> = output.stdout.lines().collect();
    assert_eq!(&lines[..3], &["Root [1]", "  Child [2]", "Self [4]"]);
    assert!(output.stdout.contains("orphan record 3"));
    assert!(output.stdout.contains("skipped line 6"));
}

#[test]
fn plan_json_lists_forest() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let input = write_input(temp_dir.path(), SCENARIO);

    let output = run_vprov(&[
        "plan",
        "--input",
        input.to_str().expect("utf-8 path"),
        "--json",
    ]);
    assert!(output.success, "plan failed: {}", output.stderr);
    let plan: Value = serde_json::from_str(&output.stdout).expect("parse plan");
    assert_eq!(plan["forest"]["roots"][0]["name"], "Root");
    assert_eq!(plan["forest"]["roots"][0]["children"][0]["name"], "Child");
    assert_eq!(plan["forest"]["orphans"][0], 3);
    assert_eq!(plan["skipped"][0]["reason"]["kind"], "unsafe_name");
}

#[test]
fn missing_input_fails_before_provisioning() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let state = temp_dir.path().join("state.json");
    let missing = temp_dir.path().join("missing.csv");

    let output = run_vprov(&[
        "provision",
        "--input",
        missing.to_str().expect("utf-8 path"),
        "--state",
        state.to_str().expect("utf-8 path"),
    ]);
    assert!(!output.success);
    assert!(output.stderr.contains("unavailable"), "stderr: {}", output.stderr);
    assert!(!state.exists());
}

#[test]
fn invalid_timing_flags_are_rejected() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let input = write_input(temp_dir.path(), SCENARIO);
    let state = temp_dir.path().join("state.json");

    let output = run_vprov(&[
        "provision",
        "--input",
        input.to_str().expect("utf-8 path"),
        "--state",
        state.to_str().expect("utf-8 path"),
        "--poll-interval-ms",
        "500",
        "--timeout-ms",
        "100",
    ]);
    assert!(!output.success);
    assert!(output.stderr.contains("timeout_ms"), "stderr: {}", output.stderr);
}
