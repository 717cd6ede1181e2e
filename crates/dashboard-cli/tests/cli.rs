use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

fn valid_config(dir: &Path) -> String {
    write(
        dir,
        "config.json",
        r#"{
            "tenant_id": "tenant-1",
            "client_id": "client-1",
            "redirect_uri": "https://tab.example/auth",
            "container": "team",
            "language": "en"
        }"#,
    )
}

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("student-dashboard").unwrap();
    cmd.env_remove("DASHBOARD_REFRESH_TOKEN")
        .env_remove("STUDENT_DASHBOARD_LOG");
    cmd
}

#[test]
fn validate_config_prints_normalized_config() {
    let dir = TempDir::new().unwrap();
    let config = valid_config(dir.path());
    cli()
        .args(["validate-config", "--config", &config])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""ok": true"#))
        .stdout(predicate::str::contains(r#""graph_base_url": "https://graph.microsoft.com/v1.0""#))
        .stdout(predicate::str::contains("DTI 301 - Professional Ethics"));
}

#[test]
fn validate_config_rejects_relative_redirect() {
    let dir = TempDir::new().unwrap();
    let config = write(
        dir.path(),
        "config.json",
        r#"{"tenant_id": "t", "client_id": "c", "redirect_uri": "/auth"}"#,
    );
    cli()
        .args(["validate-config", "--config", &config])
        .assert()
        .code(2)
        .stdout(predicate::str::contains(r#""ok": false"#))
        .stdout(predicate::str::contains("redirect_uri must be an absolute URL"));
}

#[test]
fn validate_config_reads_environment() {
    cli()
        .args(["validate-config"])
        .env("DASHBOARD_TENANT_ID", "tenant-env")
        .env("DASHBOARD_CLIENT_ID", "client-env")
        .env("DASHBOARD_REDIRECT_URI", "https://tab.example/auth")
        .env("DASHBOARD_CONTAINER", "class")
        .assert()
        .success()
        .stdout(predicate::str::contains("tenant-env"))
        .stdout(predicate::str::contains(r#""container": "class""#));
}

#[test]
fn render_without_host_shows_context_placeholder() {
    let dir = TempDir::new().unwrap();
    let config = valid_config(dir.path());
    let missing = dir.path().join("absent.json");
    cli()
        .args(["render", "--config", &config, "--context"])
        .arg(&missing)
        .assert()
        .success()
        .stdout(predicate::str::contains("Loading Teams context..."));
}

#[test]
fn render_without_account_shows_name_placeholder() {
    let dir = TempDir::new().unwrap();
    let config = valid_config(dir.path());
    let context = write(
        dir.path(),
        "context.json",
        r#"{"team": {"groupId": "G1"}, "channel": {"id": "19:c"}, "app": {"locale": "en-us"}}"#,
    );
    cli()
        .args(["render", "--config", &config, "--context", &context, "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""state": "ready""#))
        .stdout(predicate::str::contains(r#""student_name": "Loading...""#))
        .stdout(predicate::str::contains("DTI 301 - Professional Ethics"));
}

#[test]
fn reflect_rejects_blank_text_before_network() {
    let dir = TempDir::new().unwrap();
    let config = valid_config(dir.path());
    let context = write(dir.path(), "context.json", r#"{"team": {"groupId": "C1"}}"#);
    cli()
        .args([
            "reflect",
            "--config",
            &config,
            "--context",
            &context,
            "--assignment-id",
            "a1",
            "--text",
            "   ",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("reflection text is empty"));
}

#[test]
fn share_requires_a_channel() {
    let dir = TempDir::new().unwrap();
    let config = valid_config(dir.path());
    let context = write(dir.path(), "context.json", r#"{"team": {"groupId": "G1"}}"#);
    cli()
        .args(["share", "--config", &config, "--context", &context])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("channel id required"));
}

#[test]
fn unreadable_account_file_fails() {
    let dir = TempDir::new().unwrap();
    let config = valid_config(dir.path());
    let context = write(dir.path(), "context.json", r#"{"team": {"groupId": "G1"}}"#);
    let account = write(dir.path(), "account.json", "not json");
    cli()
        .args([
            "render", "--config", &config, "--context", &context, "--account", &account,
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("account.json"));
}

#[test]
fn reflect_without_host_context_sends_nothing() {
    let dir = TempDir::new().unwrap();
    let config = valid_config(dir.path());
    let missing = dir.path().join("absent.json");
    cli()
        .args(["reflect", "--config", &config, "--context"])
        .arg(&missing)
        .args(["--class-id", "C1", "--assignment-id", "a1", "--text", "hello"])
        .env("DASHBOARD_REFRESH_TOKEN", "rt-1")
        .assert()
        .code(6)
        .stderr(predicate::str::contains("host context unavailable"));
}

#[test]
fn share_without_host_context_sends_nothing() {
    let dir = TempDir::new().unwrap();
    let config = valid_config(dir.path());
    let missing = dir.path().join("absent.json");
    cli()
        .args(["share", "--config", &config, "--context"])
        .arg(&missing)
        .args(["--team-id", "G1", "--channel-id", "C1"])
        .env("DASHBOARD_REFRESH_TOKEN", "rt-1")
        .assert()
        .code(6)
        .stderr(predicate::str::contains("host context unavailable"));
}
