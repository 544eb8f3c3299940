use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// Keeps the developer's own Azure settings out of the run.
fn isolated(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pe-research").unwrap();
    cmd.current_dir(dir.path())
        .env("PE_RESEARCH_SECRETS_DIR", dir.path().join("no-secrets"))
        .env_remove("PE_RESEARCH_CONFIG_FILE")
        .env_remove("AZURE_OPENAI_API_KEY")
        .env_remove("AZURE_OPENAI_ENDPOINT")
        .env_remove("AZURE_OPENAI_API_VERSION")
        .env_remove("AZURE_OPENAI_DEPLOYMENT_NAME");
    cmd
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("pe-research").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: pe-research"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("--config-file <CONFIG_FILE>"))
        .stdout(predicate::str::contains("--version"));
}

#[test]
fn test_cli_start_help() {
    let mut cmd = Command::cargo_bin("pe-research").unwrap();
    cmd.arg("start")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: pe-research start"))
        .stdout(predicate::str::contains("--port <PORT>"));
}

#[test]
fn test_cli_config_help() {
    let mut cmd = Command::cargo_bin("pe-research").unwrap();
    cmd.arg("config")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("test"))
        .stdout(predicate::str::contains("set"));
}

#[test]
fn test_cli_no_command() {
    let mut cmd = Command::cargo_bin("pe-research").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage: pe-research"));
}

#[test]
fn test_config_show_unconfigured() {
    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"configured\": false"));
}

#[test]
fn test_config_set_then_show_redacts_key() {
    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .args([
            "config",
            "set",
            "--api-key",
            "cli-secret",
            "--endpoint",
            "https://example.openai.azure.com",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("***CONFIGURED***"))
        .stdout(predicate::str::contains("cli-secret").not());

    assert!(dir.path().join("azure-config.json").exists());

    isolated(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"configured\": true"))
        .stdout(predicate::str::contains("cli-secret").not());
}

#[test]
fn test_config_set_keeps_key_out_of_logs() {
    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .env("RUST_LOG", "debug")
        .args([
            "config",
            "set",
            "--api-key",
            "SUPER-SECRET-KEY-123",
            "--endpoint",
            "https://example.openai.azure.com",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("Starting with command"))
        .stderr(predicate::str::contains("SUPER-SECRET-KEY-123").not())
        .stdout(predicate::str::contains("SUPER-SECRET-KEY-123").not());
}

// An unrelated variable that is not valid UTF-8 must not stop startup.
#[cfg(unix)]
#[test]
fn test_non_utf8_environment_is_ignored() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .env("PE_RESEARCH_UNRELATED", OsStr::from_bytes(b"f\xffo"))
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"configured\": false"));
}

#[test]
fn test_config_set_rejects_bad_endpoint() {
    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .args(["config", "set", "--api-key", "k", "--endpoint", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("endpoint:"));
    assert!(!dir.path().join("azure-config.json").exists());
}

#[test]
fn test_config_test_fails_when_unconfigured() {
    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .args(["config", "test"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"success\": false"));
}

#[test]
fn test_chat_answers_from_fallback() {
    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .args(["chat", "--session", "cli"])
        .write_stdin("Analyze Slack\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Company Analysis Framework"));
}
