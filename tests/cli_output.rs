//! CLI Output Tests
//!
//! - stdout carries exactly one JSON response per command
//! - log lines go to stderr, each one a JSON object
//! - a failing command reports its error once and exits non-zero

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn write_config(temp_dir: &TempDir) -> PathBuf {
    let dataset = temp_dir.path().join("dataset");
    fs::create_dir_all(&dataset).unwrap();
    fs::write(dataset.join("VERSION"), "2024-06-01").unwrap();
    fs::write(dataset.join("themes.jsonl"), "{\"id\": 1, \"name\": \"Town\"}\n").unwrap();
    fs::write(
        dataset.join("sets.jsonl"),
        "{\"set_num\": \"100-1\", \"name\": \"Starter\", \"year\": 1980, \"theme_id\": 1, \"num_parts\": 0}\n",
    )
    .unwrap();

    let config_path = temp_dir.path().join("brickdb.json");
    let config = json!({
        "data_dir": temp_dir.path().join("data").to_string_lossy(),
        "dataset_dir": dataset.to_string_lossy(),
        "log_level": "info"
    });
    fs::write(&config_path, config.to_string()).unwrap();
    config_path
}

fn brickdb(args: &[&str], config: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_brickdb"))
        .args(args)
        .arg("--config")
        .arg(config)
        .output()
        .expect("binary runs")
}

fn stdout_response(output: &Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).unwrap();
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 1, "stdout: {}", stdout);
    serde_json::from_str(lines[0]).unwrap()
}

fn stderr_events(output: &Output) -> Vec<Value> {
    String::from_utf8(output.stderr.clone())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap_or_else(|_| panic!("not a log line: {}", line)))
        .collect()
}

// =============================================================================
// Stream Separation
// =============================================================================

/// Logs never interleave with the response.
#[test]
fn test_load_response_alone_on_stdout() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir);

    let output = brickdb(&["load"], &config);
    assert!(output.status.success());

    let response = stdout_response(&output);
    assert_eq!(response["status"], json!("ok"));
    assert_eq!(response["data"]["version"], json!("2024-06-01"));

    let events = stderr_events(&output);
    assert!(!events.is_empty());
    assert!(events.iter().all(|e| e["event"].is_string()));
}

/// The error response is the only report of a failure.
#[test]
fn test_failure_reported_once() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir);
    assert!(brickdb(&["load"], &config).status.success());

    let output = brickdb(&["inventory", "--set", "404-1"], &config);
    assert_eq!(output.status.code(), Some(1));

    let response = stdout_response(&output);
    assert_eq!(response["status"], json!("error"));
    assert!(response["message"].as_str().unwrap().contains("404-1"));

    // every stderr line is a structured event; no bare error text
    stderr_events(&output);
}
