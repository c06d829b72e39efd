use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Short square wave so a few hundred ms of loop time sees both signs
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[controller]
kp_q15 = 4000
ki_q15 = 300

[schedule]
period_ms = 10

[reference]
kind = "square"
amplitude_rpm = 1500
half_period_ms = 200

[logging]
level = "warn"
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["run", "--duration-ms", "500"], 0, "ticks=49 ", "stdout")]
#[case(&["run", "--max-ticks", "7"], 0, "ticks=7 ", "stdout")]
#[case(&["self-check"], 0, "self-check ok", "stdout")]
#[case(&[], 2, "Usage", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("spinloop").unwrap();
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        _ => {
            assert.stderr(predicate::str::contains(needle));
        }
    }
}

#[test]
fn json_summary_is_parseable() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("spinloop")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .args(["run", "--max-ticks", "20"])
        .output()
        .unwrap();
    assert!(out.status.success());

    let stdout = String::from_utf8(out.stdout).unwrap();
    let v: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(v["ticks"], 20);
    assert_eq!(v["interrupted"], false);
    assert_eq!(v["last"]["tick_ms"], 200);
    assert!(v["peak_duty_pct"].as_f64().unwrap() > 0.0);
}

#[test]
fn trace_csv_has_header_and_one_row_per_tick() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let trace = dir.path().join("trace.csv");

    Command::cargo_bin("spinloop")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--max-ticks", "5", "--trace-csv"])
        .arg(&trace)
        .assert()
        .success();

    let text = fs::read_to_string(&trace).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "tick_ms,reference,velocity,command");
    assert_eq!(lines.len(), 6);
    assert!(lines[1].starts_with("10,"));
    assert!(lines[5].starts_with("50,"));
}

#[test]
fn reference_csv_override_is_followed() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let profile = dir.path().join("profile.csv");
    fs::write(&profile, "t_ms,rpm\n0,800\n50,-400\n").unwrap();
    let trace = dir.path().join("trace.csv");

    Command::cargo_bin("spinloop")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--max-ticks", "10", "--reference-csv"])
        .arg(&profile)
        .arg("--trace-csv")
        .arg(&trace)
        .assert()
        .success();

    let mut rdr = csv::Reader::from_path(&trace).unwrap();
    let refs: Vec<i32> = rdr
        .records()
        .map(|r| r.unwrap()[1].parse().unwrap())
        .collect();
    // ticks 10..=40 precede the 50 ms point
    assert_eq!(refs[..4], [800; 4]);
    assert_eq!(refs[4..], [-400; 6]);
}

#[test]
fn bad_reference_csv_header_is_explained() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let profile = dir.path().join("profile.csv");
    fs::write(&profile, "time,speed\n0,800\n").unwrap();

    Command::cargo_bin("spinloop")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--reference-csv"])
        .arg(&profile)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Expected 't_ms,rpm'"));
}

#[test]
fn invalid_config_reports_the_offending_key() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cfg.toml");
    fs::write(&path, "[estimator]\ncapacity = 4\n").unwrap();

    Command::cargo_bin("spinloop")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("estimator.capacity * schedule.period_ms"));
}

#[test]
fn missing_config_file_fails_cleanly() {
    let dir = tempdir().unwrap();

    Command::cargo_bin("spinloop")
        .unwrap()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not read the config file"));
}

#[test]
fn json_errors_are_structured() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cfg.toml");
    fs::write(&path, "[schedule]\nperiod_ms = 0\n").unwrap();

    let out = Command::cargo_bin("spinloop")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .arg("--json")
        .arg("self-check")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));

    let stderr = String::from_utf8(out.stderr).unwrap();
    let last = stderr.lines().last().unwrap();
    let v: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(v["reason"], "Error");
    assert!(
        v["message"]
            .as_str()
            .unwrap()
            .contains("schedule.period_ms must be > 0")
    );
}

#[test]
fn realtime_run_paces_on_wall_clock() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let start = std::time::Instant::now();
    Command::cargo_bin("spinloop")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--realtime", "--duration-ms", "100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("run complete"));
    assert!(start.elapsed() >= std::time::Duration::from_millis(90));
}
