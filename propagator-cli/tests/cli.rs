use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn propagator_cmd(cwd: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("propagator"));
    cmd.current_dir(cwd)
        .env("NO_COLOR", "1")
        .env_remove("GH_PAT")
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("DRY_RUN")
        .env_remove("SPECIFIC_SITE");
    cmd
}

#[test]
fn site_add_then_list() {
    let dir = TempDir::new().expect("tempdir");

    propagator_cmd(dir.path())
        .args(["site", "add", "acme/landing", "Acme Landing"])
        .assert()
        .success()
        .stdout(contains("✓ Added site: Acme Landing (acme/landing)"))
        .stdout(contains("Total sites: 1"));

    propagator_cmd(dir.path())
        .args(["site", "add", "acme/blog"])
        .assert()
        .success()
        .stdout(contains("✓ Added site: blog (acme/blog)"))
        .stdout(contains("Total sites: 2"));

    let raw = fs::read_to_string(dir.path().join("sites.json")).expect("registry");
    let json: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(json["sites"][1]["repo"], "acme/blog");
    assert_eq!(json["sites"][1]["name"], "blog");
    assert_eq!(json["sites"][1]["enabled"], true);

    propagator_cmd(dir.path())
        .args(["site", "list"])
        .assert()
        .success()
        .stdout(contains("Acme Landing"))
        .stdout(contains("acme/blog"))
        .stdout(contains("2 enabled, 0 disabled"));
}

#[test]
fn duplicate_add_fails_and_leaves_registry_untouched() {
    let dir = TempDir::new().expect("tempdir");
    propagator_cmd(dir.path())
        .args(["site", "add", "acme/landing"])
        .assert()
        .success();
    let before = fs::read_to_string(dir.path().join("sites.json")).expect("registry");

    propagator_cmd(dir.path())
        .args(["site", "add", "acme/landing", "Again"])
        .assert()
        .code(1)
        .stderr(contains("already exists"));

    let after = fs::read_to_string(dir.path().join("sites.json")).expect("registry");
    assert_eq!(before, after);
}

#[test]
fn invalid_repo_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    propagator_cmd(dir.path())
        .args(["site", "add", "not-a-repo"])
        .assert()
        .code(1)
        .stderr(contains("expected owner/name"));
    assert!(!dir.path().join("sites.json").exists());
}

#[test]
fn list_honours_registry_flag_and_disabled_sites() {
    let dir = TempDir::new().expect("tempdir");
    let registry = dir.path().join("conf").join("fleet.json");
    fs::create_dir_all(registry.parent().unwrap()).unwrap();
    fs::write(
        &registry,
        r#"{"sites":[{"repo":"acme/a","name":"A"},{"repo":"acme/b","enabled":false}]}"#,
    )
    .unwrap();

    propagator_cmd(dir.path())
        .args(["site", "list", "--registry"])
        .arg(&registry)
        .assert()
        .success()
        .stdout(contains("disabled"))
        .stdout(contains("1 enabled, 1 disabled"));
}

#[test]
fn list_without_registry_is_not_an_error() {
    let dir = TempDir::new().expect("tempdir");
    propagator_cmd(dir.path())
        .args(["site", "list"])
        .assert()
        .success()
        .stdout(contains("No site registry"));
}

#[test]
fn update_without_requirements_exits_one_and_logs() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("sites.json"), r#"{"sites":[]}"#).unwrap();

    propagator_cmd(dir.path())
        .env("GH_PAT", "token")
        .env("ANTHROPIC_API_KEY", "key")
        .arg("update")
        .assert()
        .code(1)
        .stdout(contains("PRD Propagator Starting"))
        .stdout(contains("requirements document not found"));

    let logs: Vec<_> = fs::read_dir(dir.path().join("logs"))
        .expect("logs dir")
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].starts_with("propagation_") && logs[0].ends_with(".log"));
}

#[test]
fn update_without_token_names_the_variable() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("prd.md"), "# PRD\n").unwrap();
    fs::write(dir.path().join("sites.json"), r#"{"sites":[]}"#).unwrap();

    propagator_cmd(dir.path())
        .arg("update")
        .assert()
        .code(1)
        .stderr(contains("GH_PAT environment variable not set"));
}

#[test]
fn update_with_empty_fleet_succeeds_and_prints_json() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("requirements.md"), "# PRD\n").unwrap();
    fs::write(dir.path().join("sites.json"), r#"{"sites":[]}"#).unwrap();

    propagator_cmd(dir.path())
        .env("GH_PAT", "token")
        .env("ANTHROPIC_API_KEY", "key")
        .args(["update", "--prd", "requirements.md", "--logs-dir", "out", "--json"])
        .assert()
        .success()
        .stdout(contains("0 sites to update"))
        .stdout(contains("\"errors\": 0"))
        .stdout(contains("Propagation complete!").and(contains("SUMMARY")));
    assert!(dir.path().join("out").is_dir());
}

#[test]
fn unknown_site_filter_is_fatal() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("prd.md"), "# PRD\n").unwrap();
    fs::write(
        dir.path().join("sites.json"),
        r#"{"sites":[{"repo":"acme/a"}]}"#,
    )
    .unwrap();

    propagator_cmd(dir.path())
        .env("GH_PAT", "token")
        .env("ANTHROPIC_API_KEY", "key")
        .args(["update", "--site", "acme/missing"])
        .assert()
        .code(1)
        .stderr(contains("acme/missing"));
}
