use assert_cmd::prelude::*;
use std::process::Command;
use tempfile::TempDir;

fn soulselector(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("soulselector").unwrap();
    cmd.arg("--config")
        .arg(config_dir.path().join("config.yaml"))
        .env_remove("RUST_LOG");
    cmd
}

fn stdout(cmd: &mut Command) -> String {
    let assert = cmd.assert().success();
    String::from_utf8(assert.get_output().stdout.clone()).unwrap()
}

#[test]
fn set_then_get_round_trips_through_the_file() {
    let dir = TempDir::new().unwrap();

    stdout(soulselector(&dir).args(["config", "set", "selector.maxDepth", "4"]));
    stdout(soulselector(&dir).args(["config", "set", "replay.allowRegenerate", "false"]));

    assert_eq!(
        stdout(soulselector(&dir).args(["config", "get", "selector.maxDepth"])).trim(),
        "4"
    );
    assert_eq!(
        stdout(soulselector(&dir).args(["config", "get", "replay.allowRegenerate"])).trim(),
        "false"
    );
    let raw = std::fs::read_to_string(dir.path().join("config.yaml")).unwrap();
    assert!(raw.contains("maxDepth: 4"));
}

#[test]
fn invalid_values_are_rejected() {
    let dir = TempDir::new().unwrap();
    soulselector(&dir)
        .args(["config", "set", "selector.excludeAttr", "("])
        .assert()
        .failure();
    soulselector(&dir)
        .args(["config", "get", "selector.nope"])
        .assert()
        .failure();

    std::fs::write(dir.path().join("config.yaml"), "selector:\n  maxResults: 0\n").unwrap();
    soulselector(&dir)
        .args(["config", "validate"])
        .assert()
        .failure();
}

#[test]
fn reset_and_validate() {
    let dir = TempDir::new().unwrap();
    let out = stdout(soulselector(&dir).args(["config", "validate"]));
    assert!(out.contains("defaults are valid"));

    stdout(soulselector(&dir).args(["config", "reset"]));
    let out = stdout(soulselector(&dir).args(["config", "validate"]));
    assert!(out.contains("is valid"));
    let shown = stdout(soulselector(&dir).args(["config", "show"]));
    assert!(shown.contains("timeoutMs: 30000"));
}

#[test]
fn keys_lists_typed_settings_and_reset_repairs_a_broken_file() {
    let dir = TempDir::new().unwrap();
    stdout(soulselector(&dir).args(["config", "set", "selector.excludeClass", "btn,card"]));
    let keys = stdout(soulselector(&dir).args(["config", "keys"]));
    assert!(keys.lines().any(|line| line.starts_with("selector.excludeClass") && line.ends_with("btn,card")));
    assert!(keys.lines().any(|line| line.starts_with("replay.timeoutMs") && line.ends_with("30000")));

    std::fs::write(dir.path().join("config.yaml"), "selector: [").unwrap();
    soulselector(&dir)
        .args(["config", "show"])
        .assert()
        .failure();
    stdout(soulselector(&dir).args(["config", "reset"]));
    assert_eq!(
        stdout(soulselector(&dir).args(["config", "get", "selector.maxDepth"])).trim(),
        "6"
    );
}
