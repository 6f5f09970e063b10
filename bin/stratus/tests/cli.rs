//! ---
//! srt_section: "05-networking-external-interfaces"
//! srt_subsection: "tests"
//! srt_type: "test"
//! srt_scope: "code"
//! srt_description: "Command line behaviour against an isolated state directory."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use tempfile::TempDir;

const CLOUDTRAIL_STOP: &str = "aws.defense-evasion.cloudtrail-stop";
const SES_ENUMERATE: &str = "aws.discovery.ses-enumerate";

/// Binary with a private state root and no ambient cloud credentials.
fn stratus(state: &Path) -> Command {
    let mut cmd = Command::cargo_bin("stratus").unwrap();
    cmd.env_clear()
        .env("HOME", state)
        .env("STRATUS_STATE_DIR", state)
        .env("NO_COLOR", "1");
    cmd
}

fn seed_state(state: &Path, id: &str, value: &str) {
    let directory = state.join(id);
    fs::create_dir_all(&directory).unwrap();
    fs::write(directory.join(".state"), value).unwrap();
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}

#[test]
fn version_prints_package_version() {
    let state = TempDir::new().unwrap();
    let stdout = stdout_of(stratus(state.path()).arg("version"));
    assert!(stdout.starts_with("stratus "), "{stdout}");
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn list_shows_catalog_and_filters() {
    let state = TempDir::new().unwrap();

    let all = stdout_of(stratus(state.path()).arg("list"));
    assert!(all.contains(CLOUDTRAIL_STOP));
    assert!(all.contains(SES_ENUMERATE));

    let discovery = stdout_of(
        stratus(state.path()).args(["list", "--platform", "aws", "--mitre-attack-tactic", "discovery"]),
    );
    assert!(discovery.contains(SES_ENUMERATE));
    assert!(!discovery.contains(CLOUDTRAIL_STOP));
}

#[test]
fn list_rejects_unknown_platform() {
    let state = TempDir::new().unwrap();
    stratus(state.path())
        .args(["list", "--platform", "mainframe"])
        .assert()
        .failure();
}

#[test]
fn show_prints_details() {
    let state = TempDir::new().unwrap();
    let stdout = stdout_of(stratus(state.path()).args(["show", CLOUDTRAIL_STOP]));
    assert!(stdout.contains("Stop CloudTrail Trail"));
    assert!(stdout.contains("Revertible: yes"));
}

#[test]
fn status_reads_persisted_states() {
    let state = TempDir::new().unwrap();
    seed_state(state.path(), CLOUDTRAIL_STOP, "DETONATED");

    let stdout = stdout_of(stratus(state.path()).arg("status"));
    let line_of = |id: &str| {
        stdout
            .lines()
            .find(|line| line.contains(id))
            .unwrap_or_default()
            .to_owned()
    };
    assert!(line_of(CLOUDTRAIL_STOP).contains("DETONATED"), "{stdout}");
    assert!(line_of(SES_ENUMERATE).contains("COLD"), "{stdout}");
}

#[test]
fn repeated_ids_are_handled_once() {
    let state = TempDir::new().unwrap();
    seed_state(state.path(), CLOUDTRAIL_STOP, "WARM");

    let stdout = stdout_of(stratus(state.path()).args(["status", CLOUDTRAIL_STOP, CLOUDTRAIL_STOP]));
    let rows = stdout.lines().filter(|line| line.contains(CLOUDTRAIL_STOP)).count();
    assert_eq!(rows, 1, "{stdout}");
}

#[test]
fn unknown_technique_is_rejected_before_any_work() {
    let state = TempDir::new().unwrap();
    let assert = stratus(state.path())
        .args(["detonate", "aws.made-up.technique"])
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("unknown technique name aws.made-up.technique"), "{stderr}");
    assert!(!state.path().join("aws.made-up.technique").exists());
}

#[test]
fn warmup_without_credentials_fails_authentication() {
    let state = TempDir::new().unwrap();
    let assert = stratus(state.path())
        .args(["warmup", CLOUDTRAIL_STOP])
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("authentication"), "{stderr}");
    assert!(!state.path().join(CLOUDTRAIL_STOP).exists());
}

#[test]
fn cleanup_needs_ids_or_all() {
    let state = TempDir::new().unwrap();
    stratus(state.path()).arg("cleanup").assert().failure();
}

#[test]
fn cleanup_all_with_nothing_provisioned_succeeds() {
    let state = TempDir::new().unwrap();
    stratus(state.path())
        .args(["cleanup", "--all"])
        .assert()
        .success();
}

#[test]
fn cleanup_of_cold_technique_fails() {
    let state = TempDir::new().unwrap();
    stratus(state.path())
        .args(["cleanup", SES_ENUMERATE])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn revert_of_technique_without_reverter_is_skipped() {
    let state = TempDir::new().unwrap();
    stratus(state.path())
        .args(["revert", SES_ENUMERATE])
        .assert()
        .success();
}
