use assert_cmd::prelude::*;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

const PAGE: &str = "tests/fixtures/forms.html";

fn soulselector(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("soulselector").unwrap();
    cmd.arg("--config")
        .arg(config_dir.path().join("config.yaml"))
        .env_remove("RUST_LOG");
    cmd
}

fn write_info(dir: &TempDir, info: Value) -> PathBuf {
    let path = dir.path().join("info.json");
    std::fs::write(&path, serde_json::to_string(&info).unwrap()).unwrap();
    path
}

#[test]
fn replay_falls_back_to_the_next_selector() {
    let dir = TempDir::new().unwrap();
    let info = write_info(
        &dir,
        json!({
            "levelSelectorMap": {},
            "firstSelector": ["id=shared", "div[data-form=\"login\"] >> button"]
        }),
    );

    let assert = soulselector(&dir)
        .args(["-o", "json", "replay", "--page", PAGE, "--info"])
        .arg(&info)
        .assert()
        .success();

    let value: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(value["index"].as_u64(), Some(1));
    assert_eq!(value["attempts"].as_u64(), Some(2));
    assert_eq!(value["regenerated"].as_bool(), Some(false));
    assert_eq!(value["failed"][0]["selector"].as_str(), Some("id=shared"));
}

#[test]
fn replay_reports_the_last_failure() {
    let dir = TempDir::new().unwrap();
    let info = write_info(
        &dir,
        json!({ "firstSelector": ["div[data-form=\"signup\"] >> button"] }),
    );

    let assert = soulselector(&dir)
        .args(["replay", "--page", PAGE, "--info"])
        .arg(&info)
        .assert()
        .failure();
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("element is disabled"), "{stderr}");
}

#[test]
fn replay_fills_inputs() {
    let dir = TempDir::new().unwrap();
    let info = write_info(&dir, json!({ "firstSelector": ["input[name=user]"] }));

    let assert = soulselector(&dir)
        .args(["replay", "--page", PAGE, "--action", "fill", "--value", "ada@example.com", "--info"])
        .arg(&info)
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("fill \"ada@example.com\" succeeded with input[name=user]"));
}

#[test]
fn replay_regenerates_from_a_saved_level_map() {
    let dir = TempDir::new().unwrap();
    let saved = dir.path().join("generated.json");
    soulselector(&dir)
        .args(["generate", "--page", PAGE, "--target", "div[data-form=login] >> button", "--save"])
        .arg(&saved)
        .assert()
        .success();

    let mut recorded: Value = serde_json::from_str(&std::fs::read_to_string(&saved).unwrap()).unwrap();
    recorded["firstSelector"] = json!([]);
    let info = write_info(&dir, recorded);

    let assert = soulselector(&dir)
        .args(["-o", "json", "replay", "--page", PAGE, "--info"])
        .arg(&info)
        .assert()
        .success();
    let value: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(value["regenerated"].as_bool(), Some(true));

    soulselector(&dir)
        .args(["replay", "--page", PAGE, "--no-regenerate", "--info"])
        .arg(&info)
        .assert()
        .failure();
}

#[test]
fn replay_runs_assertions() {
    let dir = TempDir::new().unwrap();
    let info = write_info(&dir, json!({ "firstSelector": ["input[name=user]"] }));

    let assert = soulselector(&dir)
        .args(["-o", "json", "replay", "--page", PAGE, "--action", "assert-value", "--value", "", "--info"])
        .arg(&info)
        .assert()
        .success();
    let value: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(value["output"], json!({ "kind": "value", "value": "" }));

    let assert = soulselector(&dir)
        .args(["replay", "--page", PAGE, "--action", "assert-value", "--value", "ada", "--info"])
        .arg(&info)
        .assert()
        .failure();
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("expected value \"ada\""), "{stderr}");

    let empty = write_info(&dir, json!({ "firstSelector": [] }));
    let assert = soulselector(&dir)
        .args(["replay", "--page", PAGE, "--action", "assert-visible", "--info"])
        .arg(&empty)
        .assert()
        .failure();
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("burying-point"), "{stderr}");
}
