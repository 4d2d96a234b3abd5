// SPDX-License-Identifier: PMPL-1.0-or-later

//! CLI behavior that does not depend on a probe crashing cleanly

use crash_probe::Registry;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn crash_probe() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_crash-probe"));
    for var in [
        "CRASH_PROBE_TYPE",
        "CRASH_PROBE_ON_LAUNCH",
        "CRASH_PROBE_RUN_ID",
        "CRASH_PROBE_FALLBACK_SECS",
        "CRASH_PROBE_CALL_CHAIN",
        "CRASH_PROBE_STATE_DIR",
    ] {
        cmd.env_remove(var);
    }
    cmd.env("NO_COLOR", "1");
    cmd
}

fn run(cmd: &mut Command) -> (Output, String, String) {
    let output = cmd.output().expect("failed to spawn crash-probe");
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    (output, stdout, stderr)
}

#[test]
fn test_list_json_matches_registry() {
    let (output, stdout, _) = run(crash_probe().args(["list", "--format", "json"]));
    assert!(output.status.success());

    let listed: Vec<serde_json::Value> = serde_json::from_str(&stdout).expect("valid json");
    let registry = Registry::builtin();
    assert_eq!(listed.len(), registry.len());
    for (entry, name) in listed.iter().zip(registry.names()) {
        assert_eq!(entry["name"], name);
    }
}

#[test]
fn test_list_table_filters_category() {
    let (output, stdout, _) = run(crash_probe().args(["list", "--category", "threading"]));
    assert!(output.status.success());
    assert!(stdout.contains("PthreadLockHeld"));
    assert!(!stdout.contains("DoubleFree"));
    assert!(stdout.trim_end().ends_with("1 probes"));
}

#[test]
fn test_describe_accepts_alias() {
    let (output, stdout, _) = run(crash_probe().args(["describe", "forceUnwrapNil"]));
    assert!(output.status.success());
    assert!(stdout.contains("UnwrapNone"));
    assert!(stdout.contains("exit 101"));
}

#[test]
fn test_unknown_probe_is_an_error_not_a_crash() {
    let (output, _, stderr) = run(crash_probe().args(["run", "not-a-real-name"]));
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("unknown probe 'not-a-real-name'"), "stderr:\n{}", stderr);
    assert!(!stderr.contains("firing"));
}

#[test]
fn test_unknown_probe_suggests_close_name() {
    let (output, _, stderr) = run(crash_probe().args(["run", "doublefre"]));
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("did you mean 'DoubleFree'"), "stderr:\n{}", stderr);
}

fn launch_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("driver.yaml");
    fs::write(
        &path,
        format!(
            "probe: Panic\ncrash_on_launch: true\nrun_id: cli-run\ncall_chain: false\n\
             fallback_secs: 20\nstate_dir: {}\nlaunch_delay_ms:\n  min: 0\n  max: 0\n",
            dir.join("state").display()
        ),
    )
    .unwrap();
    path
}

#[test]
fn test_launch_crashes_once_per_run_id() {
    let dir = TempDir::new().unwrap();
    let config = launch_config(dir.path());

    let (first, _, stderr) = run(crash_probe().arg("--config").arg(&config).arg("launch"));
    assert_eq!(first.status.code(), Some(101), "stderr:\n{}", stderr);
    assert!(stderr.contains("firing Panic"));

    let marker = dir.path().join("state").join("launch-cli-run.json");
    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&marker).unwrap()).unwrap();
    assert_eq!(saved["probe"], "Panic");

    let (second, _, stderr) = run(crash_probe().arg("--config").arg(&config).arg("launch"));
    assert!(second.status.success(), "stderr:\n{}", stderr);
    assert!(stderr.contains("already crashed with Panic"));
}

#[test]
fn test_launch_env_overrides_config_file() {
    let dir = TempDir::new().unwrap();
    let config = launch_config(dir.path());

    let (output, _, stderr) = run(crash_probe()
        .arg("--config")
        .arg(&config)
        .arg("launch")
        .env("CRASH_PROBE_ON_LAUNCH", "0"));
    assert!(output.status.success(), "stderr:\n{}", stderr);
    assert!(stderr.contains("launch mode disabled"));
    assert!(!dir.path().join("state").exists());
}
