//! E2E tests for `gfs keep`, `gfs prune` and `gfs explain`.
//!
//! Each test runs the `gfs` binary as a subprocess in an isolated temp
//! directory with its own user config home.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

const FMT: &str = "%Y-%m-%dT%H:%M:%S";

const HISTORY: &str = "\
2017-05-21T22:00:00
2017-05-21T21:00:00
2017-05-20T20:00:00
2017-05-14T19:00:00
2017-05-13T18:00:00
2017-05-07T17:00:00
2017-04-30T16:00:00
2017-04-23T15:00:00
2016-12-25T14:00:00
2015-12-30T13:00:00
";

/// Build a Command targeting the gfs binary, rooted in `dir`.
fn gfs_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("gfs"));
    cmd.current_dir(dir);
    // Suppress tracing output that goes to stderr
    cmd.env("GFS_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join("xdg"));
    cmd.env_remove("FORMAT");
    cmd.env_remove("GFS_TIMING");
    cmd
}

fn write_history(dir: &Path) -> PathBuf {
    let path = dir.join("dates.txt");
    fs::write(&path, HISTORY).expect("write history");
    path
}

fn two_of_each() -> [&'static str; 10] {
    ["-f", FMT, "-y", "2", "-m", "2", "-w", "2", "-d", "2"]
}

fn stdout_lines(output: &std::process::Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// keep / prune
// ---------------------------------------------------------------------------

#[test]
fn keep_prints_retained_dates_in_input_order() {
    let dir = TempDir::new().expect("tempdir");
    let file = write_history(dir.path());

    let output = gfs_cmd(dir.path())
        .arg("keep")
        .args(two_of_each())
        .arg(&file)
        .output()
        .expect("keep should not crash");
    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        [
            "2017-05-21T22:00:00",
            "2017-05-20T20:00:00",
            "2017-05-14T19:00:00",
            "2017-04-30T16:00:00",
            "2016-12-25T14:00:00",
        ]
    );
}

#[test]
fn prune_prints_the_complement() {
    let dir = TempDir::new().expect("tempdir");
    let file = write_history(dir.path());

    let output = gfs_cmd(dir.path())
        .arg("prune")
        .args(two_of_each())
        .arg(&file)
        .output()
        .expect("prune should not crash");
    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        [
            "2017-05-21T21:00:00",
            "2017-05-13T18:00:00",
            "2017-05-07T17:00:00",
            "2017-04-23T15:00:00",
            "2015-12-30T13:00:00",
        ]
    );
}

#[test]
fn keep_reads_stdin_and_skips_blank_lines() {
    let dir = TempDir::new().expect("tempdir");

    gfs_cmd(dir.path())
        .args(["keep", "-d", "1"])
        .write_stdin("2024-03-01\n\n  2024-03-03  \n2024-03-02\n")
        .assert()
        .success()
        .stdout("2024-03-03\n");
}

#[test]
fn dash_means_stdin() {
    let dir = TempDir::new().expect("tempdir");

    gfs_cmd(dir.path())
        .args(["prune", "--monthly", "1", "-"])
        .write_stdin("2024-02-10\n2024-03-01\n")
        .assert()
        .success()
        .stdout("2024-02-10\n");
}

#[test]
fn keep_spec_flag_selects_named_cycle() {
    let dir = TempDir::new().expect("tempdir");

    gfs_cmd(dir.path())
        .args(["keep", "--keep", "Year=1"])
        .write_stdin("2023-06-01\n2024-01-01\n2024-12-31\n")
        .assert()
        .success()
        .stdout("2024-12-31\n");
}

#[test]
fn json_output_has_dates_and_totals() {
    let dir = TempDir::new().expect("tempdir");
    let file = write_history(dir.path());

    let output = gfs_cmd(dir.path())
        .args(["keep", "--json"])
        .args(two_of_each())
        .arg(&file)
        .output()
        .expect("keep should not crash");
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["selection"], "keep");
    assert_eq!(json["format"], FMT);
    assert_eq!(json["total"], 10);
    assert_eq!(json["dates"].as_array().map(Vec::len), Some(5));
}

#[test]
fn pretty_output_has_heading() {
    let dir = TempDir::new().expect("tempdir");

    gfs_cmd(dir.path())
        .args(["--format", "pretty", "prune", "-d", "1"])
        .write_stdin("2024-03-01\n2024-03-02\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dates to remove (1 of 2)"))
        .stdout(predicate::str::contains("2024-03-01"));
}

#[test]
fn quiet_prints_bare_dates_even_when_pretty_requested() {
    let dir = TempDir::new().expect("tempdir");

    gfs_cmd(dir.path())
        .args(["--format", "pretty", "-q", "keep", "-d", "1"])
        .write_stdin("2024-03-01\n2024-03-02\n")
        .assert()
        .success()
        .stdout("2024-03-02\n");
}

#[test]
fn user_config_selects_output_mode() {
    let dir = TempDir::new().expect("tempdir");
    let config_dir = dir.path().join("xdg/gfs");
    fs::create_dir_all(&config_dir).expect("mkdir");
    fs::write(config_dir.join("config.toml"), "output = \"json\"\n").expect("write");

    let output = gfs_cmd(dir.path())
        .args(["keep", "-d", "1"])
        .write_stdin("2024-03-01\n")
        .output()
        .expect("keep should not crash");
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["dates"][0], "2024-03-01");
}

#[test]
fn empty_input_prints_nothing() {
    let dir = TempDir::new().expect("tempdir");

    gfs_cmd(dir.path())
        .args(["keep", "-d", "3"])
        .write_stdin("")
        .assert()
        .success()
        .stdout("");
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn unknown_cycle_fails() {
    let dir = TempDir::new().expect("tempdir");

    gfs_cmd(dir.path())
        .args(["keep", "--keep", "fortnightly=2"])
        .write_stdin("2024-03-01\n")
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("policy not available: fortnightly"));
}

#[test]
fn zero_capacity_fails() {
    let dir = TempDir::new().expect("tempdir");

    gfs_cmd(dir.path())
        .args(["keep", "-w", "0"])
        .write_stdin("2024-03-01\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid capacity 0"));
}

#[test]
fn negative_capacity_fails() {
    let dir = TempDir::new().expect("tempdir");

    gfs_cmd(dir.path())
        .args(["prune", "-d", "-3"])
        .write_stdin("2024-03-01\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid capacity -3"));
}

#[test]
fn missing_policy_fails() {
    let dir = TempDir::new().expect("tempdir");

    gfs_cmd(dir.path())
        .arg("keep")
        .write_stdin("2024-03-01\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no policy configured"));
}

#[test]
fn malformed_date_names_the_input_and_prints_nothing() {
    let dir = TempDir::new().expect("tempdir");

    gfs_cmd(dir.path())
        .args(["keep", "-d", "3"])
        .write_stdin("2024-03-01\n2024-03-0x\n2024-03-02\n")
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("2024-03-0x"));
}

#[test]
fn json_errors_carry_code() {
    let dir = TempDir::new().expect("tempdir");

    let output = gfs_cmd(dir.path())
        .args(["keep", "--json", "-d", "3"])
        .write_stdin("not-a-date\n")
        .output()
        .expect("keep should not crash");
    assert!(!output.status.success());

    let json: Value = serde_json::from_slice(&output.stderr).expect("valid JSON error");
    assert_eq!(json["error"]["error_code"], "E2001");
    assert!(
        json["error"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("not-a-date"))
    );
}

#[test]
fn missing_file_fails() {
    let dir = TempDir::new().expect("tempdir");

    gfs_cmd(dir.path())
        .args(["keep", "-d", "1", "nope.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.txt"));
}

// ---------------------------------------------------------------------------
// Project config
// ---------------------------------------------------------------------------

#[test]
fn project_config_supplies_policy_and_format() {
    let dir = TempDir::new().expect("tempdir");
    let file = write_history(dir.path());
    fs::write(
        dir.path().join("gfs.toml"),
        format!("format = \"{FMT}\"\n\n[keep]\nyearly = 2\nmonthly = 2\nweekly = 2\ndaily = 2\n"),
    )
    .expect("write config");

    let output = gfs_cmd(dir.path())
        .arg("keep")
        .arg(&file)
        .output()
        .expect("keep should not crash");
    assert!(
        output.status.success(),
        "keep failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(stdout_lines(&output).len(), 5);
}

#[test]
fn custom_cycle_from_explicit_config() {
    let dir = TempDir::new().expect("tempdir");
    let config = dir.path().join("hourly.toml");
    fs::write(
        &config,
        "format = \"%Y-%m-%dT%H:%M\"\n\n[[custom]]\nname = \"hourly\"\nkey = \"%Y-%m-%dT%H\"\nkeep = 2\n",
    )
    .expect("write config");

    gfs_cmd(dir.path())
        .arg("keep")
        .arg("--config")
        .arg(&config)
        .write_stdin("2024-03-01T10:15\n2024-03-01T10:45\n2024-03-01T11:05\n2024-03-01T09:59\n")
        .assert()
        .success()
        .stdout("2024-03-01T10:45\n2024-03-01T11:05\n");
}

#[test]
fn documented_hourly_example_runs() {
    let dir = TempDir::new().expect("tempdir");
    let file = dir.path().join("dates.txt");
    fs::write(&file, "2017-05-21T22\n2017-05-21T21\n2017-05-20T09\n").expect("write dates");

    gfs_cmd(dir.path())
        .args(["keep", "-f", "%Y-%m-%dT%H", "--cycle", "hourly=%Y-%m-%dT%H"])
        .args(["--keep", "hourly=2"])
        .arg(&file)
        .assert()
        .success()
        .stdout("2017-05-21T22\n2017-05-21T21\n");
}

#[test]
fn keep_flag_overrides_config_custom_cycle() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(
        dir.path().join("gfs.toml"),
        "format = \"%Y-%m-%dT%H\"\n\n[[custom]]\nname = \"hourly\"\nkey = \"%Y-%m-%dT%H\"\nkeep = 24\n",
    )
    .expect("write config");

    gfs_cmd(dir.path())
        .args(["keep", "--keep", "hourly=1"])
        .write_stdin("2024-03-01T10\n2024-03-01T11\n")
        .assert()
        .success()
        .stdout("2024-03-01T11\n");
}

#[test]
fn hour_precision_dates_share_a_daily_bucket() {
    let dir = TempDir::new().expect("tempdir");

    gfs_cmd(dir.path())
        .args(["keep", "-f", "%Y-%m-%dT%H", "-d", "1"])
        .write_stdin("2017-05-21T22\n2017-05-21T10\n")
        .assert()
        .success()
        .stdout("2017-05-21T22\n");
}

#[test]
fn month_precision_dates_are_accepted() {
    let dir = TempDir::new().expect("tempdir");

    gfs_cmd(dir.path())
        .args(["prune", "-f", "%Y-%m", "-y", "1"])
        .write_stdin("2016-12\n2017-01\n2017-05\n")
        .assert()
        .success()
        .stdout("2016-12\n2017-01\n");
}

#[test]
fn broken_config_fails() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("gfs.toml"), "[keep\n").expect("write config");

    gfs_cmd(dir.path())
        .args(["keep", "-d", "1"])
        .write_stdin("2024-03-01\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("gfs.toml"));
}

// ---------------------------------------------------------------------------
// explain / completions
// ---------------------------------------------------------------------------

#[test]
fn explain_lists_cycles_with_survivors() {
    let dir = TempDir::new().expect("tempdir");
    let file = write_history(dir.path());

    let output = gfs_cmd(dir.path())
        .args(["explain", "--json"])
        .args(two_of_each())
        .arg(&file)
        .output()
        .expect("explain should not crash");
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let cycles = json["cycles"].as_array().expect("cycles array");
    let names: Vec<&str> = cycles.iter().filter_map(|c| c["cycle"].as_str()).collect();
    assert_eq!(names, ["daily", "weekly", "monthly", "yearly"]);

    let yearly = &cycles[3];
    assert_eq!(yearly["capacity"], 2);
    assert_eq!(
        yearly["kept"],
        serde_json::json!(["2016-12-25T14:00:00", "2017-05-21T22:00:00"])
    );
    assert_eq!(json["retained"].as_array().map(Vec::len), Some(5));
    assert_eq!(json["removed"], 5);
}

#[test]
fn explain_text_is_tab_separated() {
    let dir = TempDir::new().expect("tempdir");

    gfs_cmd(dir.path())
        .args(["explain", "-d", "1", "-m", "1"])
        .write_stdin("2024-02-28\n2024-03-01\n")
        .assert()
        .success()
        .stdout("daily\t2024-03-01\nmonthly\t2024-03-01\n");
}

#[test]
fn completions_mention_binary_name() {
    let dir = TempDir::new().expect("tempdir");

    gfs_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gfs"));
}

#[test]
fn timing_report_goes_to_stderr() {
    let dir = TempDir::new().expect("tempdir");

    gfs_cmd(dir.path())
        .args(["--timing", "keep", "-d", "1"])
        .write_stdin("2024-03-01\n")
        .assert()
        .success()
        .stdout("2024-03-01\n")
        .stderr(predicate::str::contains("timing report"));
}
