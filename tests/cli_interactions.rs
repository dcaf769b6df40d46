//! CLI interaction tests
//!
//! Runs the `nbt` binary against a temporary data directory and checks
//! output, formats and exit codes.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::process::Command;
use tempfile::TempDir;

/// Helper function to create a test command rooted in `dir`
///
/// The working directory is the temp dir so no stray `.env` is picked up.
fn create_test_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("nbt").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("NBT_DATA_DIR")
        .env_remove("NBT_OUTPUT_FORMAT")
        .env_remove("NBT_DEFAULT_VARIANT")
        .env_remove("ENABLE_COLOR")
        .arg("--data-dir")
        .arg(dir.path());
    cmd
}

/// Helper function to write one partition file
fn write_partition(dir: &TempDir, partition: &str, documents: &[Value]) {
    let lines: Vec<String> = documents.iter().map(|document| document.to_string()).collect();
    fs::write(dir.path().join(format!("{}.jsonl", partition)), lines.join("\n")).unwrap();
}

fn seeded_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_partition(
        &dir,
        "kcp_test",
        &[json!({
            "_id": "k1",
            "library": "kcp",
            "upstreamLoss": "0",
            "upstreamLatency": "12",
            "upstreamDeviation": "3",
            "downstreamLoss": "1",
            "downstreamLatency": "14",
            "downstreamDeviation": "4",
            "maxRtt": "45",
            "timeStamp": "1554076800",
            "rttData": ["5", "25", "44", "10"]
        })],
    );
    write_partition(
        &dir,
        "enet_test",
        &[json!({"_id": "bad", "library": "enet", "maxRtt": "20", "rttData": ["5", "-3"]})],
    );
    dir
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_variants_lists_every_partition() {
    let dir = TempDir::new().unwrap();

    create_test_cmd(&dir)
        .arg("variants")
        .arg("--no-color")
        .assert()
        .success()
        .stdout(predicate::str::contains("mrtp-redundancy-noack"))
        .stdout(predicate::str::contains("enet_test"))
        .stdout(predicate::str::contains("KCP Test Data"));
}

#[test]
fn test_list_json_format() {
    let dir = seeded_dir();

    let output = create_test_cmd(&dir)
        .args(["list", "kcp", "--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let listing = stdout_json(&output);
    assert_eq!(listing.as_array().unwrap().len(), 1);
    assert_eq!(listing[0]["id"], "k1");
    assert!(listing[0].get("rttData").is_none());
}

#[test]
fn test_list_empty_partition() {
    let dir = TempDir::new().unwrap();

    create_test_cmd(&dir)
        .args(["list", "tcp", "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No runs stored for tcp"));
}

#[test]
fn test_detail_json_histogram() {
    let dir = seeded_dir();

    let output = create_test_cmd(&dir)
        .args(["detail", "kcp", "k1", "--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let detail = stdout_json(&output);
    assert_eq!(
        detail["histogram"]["buckets"],
        json!([
            {"label": "0ms", "count": 2},
            {"label": "20ms", "count": 1},
            {"label": "40ms", "count": 1}
        ])
    );
    assert!(detail.get("rawSeries").is_none());

    let output = create_test_cmd(&dir)
        .args(["detail", "kcp", "k1", "--format", "json", "--raw"])
        .output()
        .unwrap();
    assert_eq!(stdout_json(&output)["rawSeries"].as_array().unwrap().len(), 4);
}

#[test]
fn test_detail_table_output() {
    let dir = seeded_dir();

    create_test_cmd(&dir)
        .args(["detail", "kcp", "k1", "--no-color", "--raw"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0ms | "))
        .stdout(predicate::str::contains("40ms"))
        .stdout(predicate::str::contains("\x1b[").not());
}

#[test]
fn test_overview_counts() {
    let dir = seeded_dir();

    let output = create_test_cmd(&dir)
        .args(["overview", "--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let overview = stdout_json(&output);
    let kcp = overview
        .as_array()
        .unwrap()
        .iter()
        .find(|entry| entry["id"] == "kcp")
        .unwrap();
    assert_eq!(kcp["count"], 1);
}

#[test]
fn test_unknown_variant_exit_code() {
    let dir = seeded_dir();

    create_test_cmd(&dir)
        .args(["list", "doesnotexist", "--no-color"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("doesnotexist"));
}

#[test]
fn test_record_not_found_exit_code() {
    let dir = seeded_dir();

    create_test_cmd(&dir)
        .args(["detail", "tcp", "nope", "--no-color"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_corrupt_record_exit_code() {
    let dir = seeded_dir();

    create_test_cmd(&dir)
        .args(["detail", "enet", "bad", "--no-color"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("bad"));
}

#[test]
fn test_malformed_partition_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("tcp_test.jsonl"), "{not json\n").unwrap();

    create_test_cmd(&dir)
        .args(["list", "tcp", "--no-color"])
        .assert()
        .failure();
}

#[test]
fn test_import_then_duplicate() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("run.csv");
    fs::write(&csv_path, "library,tcp\ntimeStamp,1554076800\nmaxRtt,30\n0,5\n1,25\n").unwrap();

    let output = create_test_cmd(&dir)
        .args(["import", "--format", "json"])
        .arg(&csv_path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let outcome = stdout_json(&output);
    assert_eq!(outcome["outcome"], "inserted");
    assert_eq!(outcome["variant"], "tcp");
    let id = outcome["id"].as_str().unwrap().to_string();

    create_test_cmd(&dir)
        .args(["import", "--no-color"])
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("already stored"));

    create_test_cmd(&dir)
        .args(["detail", "tcp", &id, "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"20ms\""));
}

#[test]
fn test_import_unknown_library() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("run.csv");
    fs::write(&csv_path, "library,quic\ntimeStamp,1\n0,5\n").unwrap();

    create_test_cmd(&dir)
        .args(["import", "--no-color"])
        .arg(&csv_path)
        .assert()
        .code(2);

    assert!(!dir.path().join("tcp_test.jsonl").exists());
}

#[test]
fn test_import_missing_file() {
    let dir = TempDir::new().unwrap();

    create_test_cmd(&dir)
        .args(["import", "does-not-exist.csv", "--no-color"])
        .assert()
        .failure();
}

#[test]
fn test_default_variant_from_env_file() {
    let dir = TempDir::new().unwrap();
    write_partition(&dir, "tcp_test", &[json!({"_id": "t1", "library": "tcp"})]);
    fs::write(dir.path().join(".env"), "NBT_DEFAULT_VARIANT=tcp\n").unwrap();

    let output = create_test_cmd(&dir)
        .args(["list", "--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(stdout_json(&output)[0]["id"], "t1");
}

#[test]
fn test_color_flags_conflict() {
    let dir = TempDir::new().unwrap();

    create_test_cmd(&dir)
        .args(["variants", "--color", "--no-color"])
        .assert()
        .failure();
}

#[test]
fn test_config_command() {
    let dir = TempDir::new().unwrap();

    create_test_cmd(&dir)
        .args(["config", "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Data Directory:"))
        .stdout(predicate::str::contains("NBT_OUTPUT_FORMAT"));
}

#[test]
fn test_help_and_version() {
    let dir = TempDir::new().unwrap();

    create_test_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("detail"))
        .stdout(predicate::str::contains("import"));

    create_test_cmd(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nbt"));
}
