use assert_cmd::prelude::*;
use serde_json::Value;
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

fn stdout_json(output: &std::process::Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).expect("utf8 output");
    serde_json::from_str(&stdout).expect("valid json")
}

#[test]
fn generate_scopes_duplicate_buttons_by_form() {
    let dir = TempDir::new().unwrap();
    let assert = soulselector(&dir)
        .args([
            "--output",
            "json",
            "generate",
            "--page",
            PAGE,
            "--target",
            "div[data-form='login'] >> button",
        ])
        .assert()
        .success();

    let value = stdout_json(assert.get_output());
    let selectors = value["firstSelector"].as_array().unwrap();
    assert!(!selectors.is_empty() && selectors.len() <= 3);
    for selector in selectors {
        let selector = selector.as_str().unwrap();
        assert!(
            selector.starts_with("div[data-form=\"login\"] >> visible = true >> "),
            "{selector}"
        );
    }
    assert_eq!(value["levelSelectorMap"]["0"]["20"].as_str(), Some(".go"));
    assert_eq!(value["levelSelectorMap"]["0"]["30"].as_str(), Some("button"));
}

#[test]
fn generate_saves_selector_info() {
    let dir = TempDir::new().unwrap();
    let saved = dir.path().join("info.json");
    soulselector(&dir)
        .args(["generate", "--page", PAGE, "--target", "input[name=user]", "--save"])
        .arg(&saved)
        .assert()
        .success();

    let raw = std::fs::read_to_string(&saved).unwrap();
    let value: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        value["firstSelector"][0].as_str(),
        Some("input[name=\"user\"] >> visible = true")
    );
}

#[test]
fn generate_requires_a_unique_target() {
    let dir = TempDir::new().unwrap();
    let assert = soulselector(&dir)
        .args(["generate", "--page", PAGE, "--target", ".card"])
        .assert()
        .failure();
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("strict mode violation"), "{stderr}");
}

#[test]
fn generate_honours_a_burying_point_from_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.yaml"),
        "selector:\n  buryingPoint: data-form\n",
    )
    .unwrap();

    let assert = soulselector(&dir)
        .args([
            "-o",
            "json",
            "generate",
            "--page",
            PAGE,
            "--target",
            "div[data-form=signup]",
        ])
        .assert()
        .success();
    let value = stdout_json(assert.get_output());
    assert_eq!(
        value["levelSelectorMap"]["0"]["0"].as_str(),
        Some("div[data-form=\"signup\"]")
    );
    assert_eq!(
        value["firstSelector"][0].as_str(),
        Some("div[data-form=\"signup\"] >> visible = true")
    );
}
