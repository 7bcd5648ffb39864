//! Integration tests for the `wallet` CLI binary.
//!
//! Argument parsing, help output, shell completions and error handling
//! run without a backend; the session flow runs against wiremock.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `wallet` binary with env isolation.
///
/// Clears all `WALLET_*` env vars and points the config and session
/// files into `dir` so tests never touch the user's real state.
fn wallet_cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("wallet");
    cmd.env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .env("XDG_DATA_HOME", dir.join("data"))
        .env("WALLET_CONFIG", dir.join("config.toml"))
        .env("WALLET_SESSION_FILE", dir.join("session.json"))
        .env("NO_COLOR", "1")
        .env_remove("WALLET_PROFILE")
        .env_remove("WALLET_API_URL")
        .env_remove("WALLET_OUTPUT")
        .env_remove("WALLET_INSECURE")
        .env_remove("WALLET_TIMEOUT")
        .env_remove("WALLET_EMAIL")
        .env_remove("WALLET_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
}

async fn backend() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "email": "ana@example.com", "password": "secret" })))
        .respond_with(ok(json!({
            "user": { "id": "u1", "email": "ana@example.com", "name": "Ana", "balance": 100 },
            "token": "access-1",
            "refreshToken": "refresh-1"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ok(json!({
            "id": "u1", "email": "ana@example.com", "name": "Ana", "balance": 100
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/transactions"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ok(json!([{
            "id": "t1",
            "amount": 50.0,
            "type": "expense",
            "categoryId": "food",
            "description": "Almoço",
            "date": "2024-01-01"
        }])))
        .mount(&server)
        .await;
    server
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = wallet_cmd(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let dir = tempfile::tempdir().unwrap();
    wallet_cmd(dir.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("personal finance")
            .and(predicate::str::contains("transactions"))
            .and(predicate::str::contains("categories"))
            .and(predicate::str::contains("login")),
    );
}

#[test]
fn test_version_flag() {
    let dir = tempfile::tempdir().unwrap();
    wallet_cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("wallet"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_zsh() {
    let dir = tempfile::tempdir().unwrap();
    wallet_cmd(dir.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_bash() {
    let dir = tempfile::tempdir().unwrap();
    wallet_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let dir = tempfile::tempdir().unwrap();
    let output = wallet_cmd(dir.path()).arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_invalid_transaction_type() {
    let dir = tempfile::tempdir().unwrap();
    wallet_cmd(dir.path())
        .args(["transactions", "list", "--type", "refund"])
        .assert()
        .code(2);
}

#[test]
fn test_commands_need_a_session() {
    let dir = tempfile::tempdir().unwrap();
    wallet_cmd(dir.path())
        .args(["transactions", "list"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Not logged in"));
}

#[test]
fn test_unknown_profile() {
    let dir = tempfile::tempdir().unwrap();
    wallet_cmd(dir.path())
        .args(["--profile", "work", "whoami"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("work"));
}

#[test]
fn test_logout_without_session_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    wallet_cmd(dir.path()).arg("logout").assert().success();
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honours_env() {
    let dir = tempfile::tempdir().unwrap();
    wallet_cmd(dir.path())
        .args(["config", "path", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_masks_password() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "default_profile = \"home\"\n\n[profiles.home]\n\
         api_url = \"http://localhost:3000/api\"\n\
         email = \"ana@example.com\"\n\
         password = \"hunter22\"\n",
    )
    .unwrap();
    wallet_cmd(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[profiles.home]")
                .and(predicate::str::contains("****"))
                .and(predicate::str::contains("hunter22").not()),
        );
}

// ── Session flow ────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_login_then_list_uses_the_stored_session() {
    let server = backend().await;
    let dir = tempfile::tempdir().unwrap();
    let api_url = format!("{}/api", server.uri());

    let login = {
        let mut cmd = wallet_cmd(dir.path());
        cmd.env("WALLET_API_URL", &api_url)
            .env("WALLET_EMAIL", "ana@example.com")
            .env("WALLET_PASSWORD", "secret")
            .args(["login", "-o", "plain"]);
        tokio::task::spawn_blocking(move || cmd.output().unwrap())
            .await
            .unwrap()
    };
    assert!(login.status.success(), "{}", combined_output(&login));
    assert_eq!(String::from_utf8_lossy(&login.stdout).trim(), "u1");
    assert!(dir.path().join("session.json").exists());

    let list = {
        let mut cmd = wallet_cmd(dir.path());
        cmd.env("WALLET_API_URL", &api_url)
            .args(["transactions", "list", "-o", "json"]);
        tokio::task::spawn_blocking(move || cmd.output().unwrap())
            .await
            .unwrap()
    };
    assert!(list.status.success(), "{}", combined_output(&list));
    let parsed: serde_json::Value = serde_json::from_slice(&list.stdout).unwrap();
    assert_eq!(parsed[0]["description"], "Almoço");

    // Destructive commands refuse to run unattended without --yes.
    let delete = {
        let mut cmd = wallet_cmd(dir.path());
        cmd.env("WALLET_API_URL", &api_url)
            .args(["transactions", "delete", "t1"]);
        tokio::task::spawn_blocking(move || cmd.output().unwrap())
            .await
            .unwrap()
    };
    assert_eq!(delete.status.code(), Some(2), "{}", combined_output(&delete));

    let logout = {
        let mut cmd = wallet_cmd(dir.path());
        cmd.env("WALLET_API_URL", &api_url).arg("logout");
        tokio::task::spawn_blocking(move || cmd.output().unwrap())
            .await
            .unwrap()
    };
    assert!(logout.status.success());

    let after = {
        let mut cmd = wallet_cmd(dir.path());
        cmd.env("WALLET_API_URL", &api_url)
            .args(["transactions", "list"]);
        tokio::task::spawn_blocking(move || cmd.output().unwrap())
            .await
            .unwrap()
    };
    assert_eq!(after.status.code(), Some(3));
}
