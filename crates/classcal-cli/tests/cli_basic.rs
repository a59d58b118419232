//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against temporary config and schedule files.
//! None of them sign in or reach the network.

use std::path::{Path, PathBuf};
use std::process::Command;

const SCHEDULE: &str = "Course,Course Name,Session Type,Day,Start Time,End Time,Location,Section\n\
                        MATH101,Calculus I,Lecture,Monday,09:00,10:00,RoomA,\n\
                        CHEM200,General Chemistry,Lab,Thursday,13:00,16:00,Lab 3,B2\n";

/// Run the CLI and return (exit code, stdout, stderr).
fn run_cli(args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_classcal"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

/// Write a TOML config and the schedule next to it.
fn fixture(dir: &Path, start: &str, end: &str, schedule: &str) -> PathBuf {
    std::fs::write(dir.join("schedule.csv"), schedule).unwrap();
    let config = dir.join("classcal.toml");
    std::fs::write(
        &config,
        format!(
            "term_start_date = \"{start}\"\nterm_end_date = \"{end}\"\n\
             timezone = \"America/Toronto\"\ncalendar_id = \"primary\"\n"
        ),
    )
    .unwrap();
    config
}

#[test]
fn test_help() {
    let (code, stdout, _) = run_cli(&["--help"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("sync"));
    assert!(stdout.contains("auth"));
    assert!(stdout.contains("config"));
}

#[test]
fn test_sync_dry_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), "2024-01-08", "2024-04-26", SCHEDULE);

    let (code, stdout, stderr) = run_cli(&["--config", config.to_str().unwrap(), "sync", "--dry-run"]);
    assert_eq!(code, 0, "dry run failed: {stderr}");
    assert!(stdout.contains("cls1e55ac13fa96d248ddb6"));
    assert!(stdout.contains("cls077d7f3b70c47c473c85"));
    assert!(stdout.contains("RRULE:FREQ=WEEKLY;UNTIL=20240427T035959Z"));
    assert!(stdout.contains("MATH101 - Calculus I (Lecture)"));
}

#[test]
fn test_sync_dry_run_json() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), "2024-01-08", "2024-04-26", SCHEDULE);

    let (code, stdout, _) = run_cli(&[
        "--config",
        config.to_str().unwrap(),
        "sync",
        "--dry-run",
        "--json",
    ]);
    assert_eq!(code, 0);

    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let planned = parsed["planned"].as_array().unwrap();
    assert_eq!(planned.len(), 2);
    assert_eq!(planned[0]["identity"], "cls1e55ac13fa96d248ddb6");
    assert_eq!(planned[0]["recurrence"]["first_date"], "2024-01-08");
    assert_eq!(planned[1]["recurrence"]["first_date"], "2024-01-11");
    assert_eq!(parsed["failed"].as_array().unwrap().len(), 0);
}

#[test]
fn test_dry_run_reports_malformed_rows() {
    let dir = tempfile::tempdir().unwrap();
    let schedule = "Course,Session Type,Day,Start Time,End Time,Location\n\
                    MATH101,Lecture,Funday,09:00,10:00,RoomA\n\
                    CHEM200,Lab,Thursday,13:00,16:00,Lab 3\n";
    let config = fixture(dir.path(), "2024-01-08", "2024-04-26", schedule);

    let (code, stdout, stderr) = run_cli(&["--config", config.to_str().unwrap(), "sync", "--dry-run"]);
    assert_ne!(code, 0);
    assert!(stdout.contains("Funday"));
    assert!(stdout.contains("CHEM200"));
    assert!(stderr.contains("malformed"));
}

#[test]
fn test_reversed_term_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), "2024-04-26", "2024-01-08", SCHEDULE);

    let (code, stdout, stderr) = run_cli(&["--config", config.to_str().unwrap(), "sync", "--dry-run"]);
    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("term"));
}

#[test]
fn test_term_missing_a_weekday_is_fatal() {
    // Monday to Wednesday holds no Thursday lab.
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), "2024-01-08", "2024-01-10", SCHEDULE);

    let (code, stdout, stderr) = run_cli(&["--config", config.to_str().unwrap(), "sync", "--dry-run"]);
    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("no Thursday falls within the term"), "{stderr}");
}

#[test]
fn test_term_missing_a_weekday_fails_before_sign_in() {
    // No credentials.json exists, so reaching sign-in would report that instead.
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), "2024-01-08", "2024-01-10", SCHEDULE);

    let (code, _, stderr) = run_cli(&["--config", config.to_str().unwrap(), "sync"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("no Thursday falls within the term"), "{stderr}");
    assert!(!stderr.contains("credentials"));
}

#[test]
fn test_auth_login_needs_only_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("classcal.toml");
    std::fs::write(&config, "credentials_file = \"client.json\"\n").unwrap();

    let (code, _, stderr) = run_cli(&["--config", config.to_str().unwrap(), "auth", "login"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("client secrets file not found"), "{stderr}");
    assert!(stderr.contains("client.json"));
    assert!(!stderr.contains("term_start_date"));
}

#[test]
fn test_config_show_and_check() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), "2024-01-08", "2024-04-26", SCHEDULE);

    let (code, stdout, _) = run_cli(&["--config", config.to_str().unwrap(), "config", "show"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["timezone"], "America/Toronto");
    assert_eq!(parsed["calendar_id"], "primary");

    let (code, stdout, _) = run_cli(&["--config", config.to_str().unwrap(), "config", "check"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");
}

#[test]
fn test_config_check_missing_columns() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), "2024-01-08", "2024-04-26", "Course,Day\nMATH101,Monday\n");

    let (code, _, stderr) = run_cli(&["--config", config.to_str().unwrap(), "config", "check"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("missing required columns"));
}

#[test]
fn test_missing_config_file() {
    let (code, _, stderr) = run_cli(&["--config", "/nonexistent/classcal.toml", "config", "check"]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"));
}
