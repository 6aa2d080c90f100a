//! CLI command integration tests.
//! Each test uses a temp directory via KNOCK_DATA_DIR for full isolation.

use assert_cmd::Command;
use knock_store::Store;
use predicates::prelude::*;
use tempfile::TempDir;

fn knock_cmd(data_dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("knock").unwrap();
    cmd.env("KNOCK_DATA_DIR", data_dir.path());
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Write metadata straight into the lock's database.
fn seed(data_dir: &TempDir, entries: &[(&str, &str)]) {
    let store = Store::open(&data_dir.path().join("knock.db")).unwrap();
    for (key, value) in entries {
        store.set(key, value).unwrap();
    }
}

#[test]
fn status_fresh_db() {
    let dir = TempDir::new().unwrap();
    knock_cmd(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("state:      unlocked"))
        .stdout(predicate::str::contains("pattern:    (none)"))
        .stdout(predicate::str::contains("timeout:    1500ms"))
        .stdout(predicate::str::contains("tolerance:  100ms"))
        .stdout(predicate::str::contains("retain:     no"));
}

#[test]
fn record_piped_taps_then_status() {
    let dir = TempDir::new().unwrap();

    knock_cmd(&dir)
        .arg("record")
        .write_stdin("\n\n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("lock activated (3 taps)"));

    knock_cmd(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("state:      locked"))
        .stdout(predicate::str::contains("taps:       3"));
}

#[test]
fn record_single_tap_is_invalid() {
    let dir = TempDir::new().unwrap();

    knock_cmd(&dir)
        .arg("record")
        .write_stdin("\n")
        .assert()
        .failure()
        .stdout(predicate::str::contains("pattern invalid"))
        .stderr(predicate::str::contains("input ended before a knock was recorded"));

    knock_cmd(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("state:      unlocked"));
}

#[test]
fn record_refused_while_locked() {
    let dir = TempDir::new().unwrap();
    seed(&dir, &[("durations", "300,900")]);

    knock_cmd(&dir)
        .arg("record")
        .write_stdin("\n\n\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already locked"));
}

#[test]
fn unlock_refused_while_unlocked() {
    let dir = TempDir::new().unwrap();
    knock_cmd(&dir)
        .arg("unlock")
        .write_stdin("\n\n\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not locked"));
}

#[test]
fn unlock_with_wrong_knock_stays_locked() {
    let dir = TempDir::new().unwrap();
    seed(&dir, &[("durations", "300,900,300,900")]);

    // Three taps can never match a four-gap knock, whatever the pipe timing.
    knock_cmd(&dir)
        .arg("unlock")
        .write_stdin("\n\n\n")
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "pattern incorrect: expected 4 gaps, got 2",
        ))
        .stderr(predicate::str::contains("input ended before the lock opened"));

    knock_cmd(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("state:      locked"))
        .stdout(predicate::str::contains("pattern:    300,900,300,900"));
}

#[test]
fn unlock_with_missing_pattern_stops() {
    let dir = TempDir::new().unwrap();
    seed(&dir, &[("lock_state", "locked")]);

    knock_cmd(&dir)
        .arg("unlock")
        .write_stdin("\n\n\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("knock reset"));
}

#[test]
fn check_scaled_match() {
    let dir = TempDir::new().unwrap();
    seed(&dir, &[("durations", "800,800")]);

    knock_cmd(&dir)
        .args(["check", "400,400"])
        .assert()
        .success()
        .stdout(predicate::str::contains("scale: 2.000"))
        .stdout(predicate::str::contains("result: match"));

    // check never changes state
    knock_cmd(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("state:      locked"));
}

#[test]
fn check_length_mismatch() {
    let dir = TempDir::new().unwrap();
    seed(&dir, &[("durations", "100,200")]);

    knock_cmd(&dir)
        .args(["check", "100,200,300"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "result: no match (expected 2 gaps, got 3)",
        ));
}

#[test]
fn check_zero_length_candidate() {
    let dir = TempDir::new().unwrap();
    seed(&dir, &[("durations", "500,500")]);

    knock_cmd(&dir)
        .args(["check", "0,0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("zero total length"));
}

#[test]
fn check_tolerance_boundary_and_override() {
    let dir = TempDir::new().unwrap();
    seed(&dir, &[("durations", "1000,1000")]);

    knock_cmd(&dir)
        .args(["check", "1100,900"])
        .assert()
        .success()
        .stdout(predicate::str::contains("result: match"));

    knock_cmd(&dir)
        .args(["check", "1101,899"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gap 0 off by 101ms"));

    knock_cmd(&dir)
        .args(["check", "1101,899", "--tolerance-ms", "150"])
        .assert()
        .success()
        .stdout(predicate::str::contains("result: match"));
}

#[test]
fn check_rejects_bad_input() {
    let dir = TempDir::new().unwrap();
    knock_cmd(&dir)
        .args(["check", "400,,400"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid durations"));
}

#[test]
fn check_without_pattern() {
    let dir = TempDir::new().unwrap();
    knock_cmd(&dir)
        .args(["check", "400,400"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no pattern recorded"));
}

#[test]
fn malformed_pattern_reported() {
    let dir = TempDir::new().unwrap();
    seed(&dir, &[("durations", "800,loud,800")]);

    knock_cmd(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("stored pattern is malformed"));

    knock_cmd(&dir)
        .args(["check", "400,400,400"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed"));
}

#[test]
fn reset_clears_pattern() {
    let dir = TempDir::new().unwrap();
    seed(&dir, &[("durations", "300,900"), ("lock_state", "locked")]);

    knock_cmd(&dir)
        .arg("reset")
        .assert()
        .success()
        .stdout(predicate::str::contains("lock reset"));

    knock_cmd(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("state:      unlocked"))
        .stdout(predicate::str::contains("pattern:    (none)"));
}

#[test]
fn relock_with_retained_pattern() {
    let dir = TempDir::new().unwrap();
    seed(&dir, &[("durations", "300,900"), ("lock_state", "unlocked")]);

    knock_cmd(&dir)
        .arg("lock")
        .assert()
        .success()
        .stdout(predicate::str::contains("lock activated (3 taps)"));

    knock_cmd(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("state:      locked"));
}

#[test]
fn relock_without_pattern_fails() {
    let dir = TempDir::new().unwrap();
    knock_cmd(&dir)
        .arg("lock")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no retained pattern"));
}

#[test]
fn status_json() {
    let dir = TempDir::new().unwrap();
    seed(&dir, &[("durations", "300,900")]);
    std::fs::write(dir.path().join("knock.toml"), "retain_on_unlock = true\n").unwrap();

    let output = knock_cmd(&dir).args(["status", "--json"]).output().unwrap();
    assert!(output.status.success());

    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["state"], "locked");
    assert_eq!(status["pattern"], serde_json::json!([300, 900]));
    assert_eq!(status["settings"]["retain_on_unlock"], true);
    assert_eq!(status["settings"]["idle_timeout_ms"], 1500);
}

#[test]
fn bad_settings_file_fails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("knock.toml"), "tolerance = 5\n").unwrap();

    knock_cmd(&dir)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid settings"));
}

#[test]
fn data_dir_flag_overrides_env() {
    let env_dir = TempDir::new().unwrap();
    let flag_dir = TempDir::new().unwrap();
    seed(&flag_dir, &[("durations", "300,900")]);

    knock_cmd(&env_dir)
        .arg("status")
        .arg("--data-dir")
        .arg(flag_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("state:      locked"));
}
