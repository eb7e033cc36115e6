//! teleop-cli 端到端测试

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn teleop() -> Command {
    let mut cmd = Command::cargo_bin("teleop-cli").unwrap();
    cmd.env("RUST_LOG", "warn");
    cmd
}

/// 解析 stdout 中的 JSON 行为 (linear, angular)
fn parse_commands(stdout: &[u8]) -> Vec<(f64, f64)> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            (
                value["linear"].as_f64().unwrap(),
                value["angular"].as_f64().unwrap(),
            )
        })
        .collect()
}

#[test]
fn run_with_tick_limit_ends_with_zero_command() {
    let output = teleop()
        .args(["run", "--max-ticks", "8", "--tick-period-ms", "5"])
        .write_stdin("Forward\n")
        .output()
        .unwrap();
    assert!(output.status.success());

    let commands = parse_commands(&output.stdout);
    assert!(commands.len() >= 2 && commands.len() <= 9, "{:?}", commands);
    assert_eq!(commands.last(), Some(&(0.0, 0.0)));
    assert!(commands.iter().all(|(linear, angular)| {
        *linear >= 0.0 && *linear <= 0.22 + 1e-9 && *angular == 0.0
    }));
}

#[test]
fn run_rejects_increment_above_limit() {
    teleop()
        .args(["run", "--angular-increment", "5.0", "--max-ticks", "1"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceeds limit"));
}

#[test]
fn run_rejects_unknown_source() {
    teleop()
        .args(["run", "--source", "tcp://127.0.0.1:1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported source"));
}

#[test]
fn simulate_prints_ramp_and_final_stop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("forward.json");
    fs::write(
        &path,
        r#"{"name": "forward", "steps": [{"label": "Forward", "ticks": 5}, {"label": "none", "ticks": 2}]}"#,
    )
    .unwrap();

    teleop()
        .arg("simulate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("0.22"))
        .stdout(predicate::str::contains("Unknown"))
        .stdout(predicate::str::contains("(final)"));

    let output = teleop()
        .arg("simulate")
        .arg(&path)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let text = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 8);
    assert_eq!(
        lines[7],
        r#"{"tick":8,"intent":"Stop","linear":0.0,"angular":0.0,"final":true}"#
    );
}

#[test]
fn config_show_applies_overrides() {
    teleop()
        .args(["config", "show", "--linear-limit", "0.3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("linear_limit = 0.3"))
        .stdout(predicate::str::contains("tick_period_ms = 100"));
}

#[test]
fn config_show_output_round_trips_through_check() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("teleop.toml");

    teleop()
        .args(["config", "show", "--tick-period-ms", "50", "--output"])
        .arg(&path)
        .assert()
        .success();

    teleop()
        .args(["config", "check"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("20.0 Hz"));
}

#[test]
fn config_check_rejects_invalid_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[ramp]\nlinear_increment = 0.5\n").unwrap();

    teleop()
        .args(["config", "check"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceeds limit"));
}

#[test]
fn simulate_strict_rejects_misspelled_label() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("typo.json");
    fs::write(&path, r#"{"name": "typo", "steps": [{"label": "Foward"}]}"#).unwrap();

    teleop().arg("simulate").arg(&path).assert().success();
    teleop()
        .arg("simulate")
        .arg(&path)
        .arg("--strict")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Foward"));
}
