use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Simulated rig, in-process store, no pacing delays
const FAST_SIM: &str = r#"
[scale]
model = "and"

[motor]
min_pwm = 15.0
max_pwm = 100.0

[control]
period_ms = 1
arm_delay_ms = 0
ready_poll_ms = 1

[store]
backend = "memory"

[leds]
enabled = false
"#;

fn write_config(dir: &tempfile::TempDir, toml: &str) -> PathBuf {
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn trickler(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("trickler").unwrap();
    cmd.arg("--config").arg(cfg).arg("--log-level").arg("warn");
    cmd.env("TRICKLER_SIM_FLOW", "1000").env("TRICKLER_SIM_START", "0");
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["run", "--once", "--auto-mode", "--target-weight", "1.00", "--target-unit", "GN"], 0, "target_reached", "stdout")]
#[case(&["run", "--once", "--auto-mode", "--target-weight", "0.05", "--target-unit", "g"], 0, "target_reached", "stdout")]
#[case(&["run", "--target-unit", "oz"], 2, "oz", "stderr")]
#[case(&["scale", "--once"], 0, "GRAINS", "stdout")]
#[case(&["motor", "--speed", "0.5", "--duration-ms", "5"], 0, "", "stdout")]
#[case(&["leds"], 0, "", "stdout")]
#[case(&["self-check"], 0, "scale ok", "stdout")]
#[case(&["self-check"], 0, "ble ok (OpenTrickler", "stdout")]
#[case(&["settings", "set", "--target-weight=-1"], 1, "negative", "stderr")]
#[case(&["settings", "set"], 1, "nothing to change", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, FAST_SIM);
    let mut cmd = trickler(&cfg);
    cmd.args(args);

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn missing_config_file_is_a_config_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    trickler(&missing)
        .arg("self-check")
        .assert()
        .code(5)
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn inverted_motor_bounds_fail_validation() {
    let dir = tempdir().unwrap();
    let cfg = write_config(
        &dir,
        &FAST_SIM
            .replace("min_pwm = 15.0", "min_pwm = 90.0")
            .replace("max_pwm = 100.0", "max_pwm = 20.0"),
    );
    trickler(&cfg)
        .arg("self-check")
        .assert()
        .code(5)
        .stderr(predicate::str::contains("min_pwm"));
}

#[test]
fn unreachable_memcached_is_a_store_error() {
    let dir = tempdir().unwrap();
    let toml = FAST_SIM.replace(
        "backend = \"memory\"",
        "backend = \"memcache\"\nserver = \"127.0.0.1:1\"\nconnect_timeout_ms = 200",
    );
    let cfg = write_config(&dir, &toml);
    trickler(&cfg)
        .arg("--json")
        .args(["settings", "get"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("\"reason\":\"Store\""));
}

#[test]
fn settings_set_prints_merged_json() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, FAST_SIM);
    let out = trickler(&cfg)
        .arg("--json")
        .args(["settings", "set", "--target-weight", "12.50", "--target-unit", "g"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["target_weight"], "12.50");
    assert_eq!(v["target_unit"], "GRAMS");
    assert!(v["auto_mode"].is_null());
}

#[test]
fn pid_tune_log_is_written() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, FAST_SIM);
    let log = dir.path().join("tune.csv");
    trickler(&cfg)
        .args(["run", "--once", "--auto-mode", "--target-weight", "0.50"])
        .arg("--pid-tune")
        .arg(&log)
        .assert()
        .success();
    let text = fs::read_to_string(&log).unwrap();
    assert!(text.starts_with("timestamp,motor_speed,weight_ratio"));
    assert!(text.lines().count() > 2);
}
