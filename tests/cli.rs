use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("nutrilog").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: nutrilog [OPTIONS] <COMMAND>"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("--api-key <API_KEY>"))
        .stdout(predicate::str::contains("--version"));
}

#[test]
fn test_cli_serve_help() {
    let mut cmd = Command::cargo_bin("nutrilog").unwrap();
    cmd.arg("serve")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: nutrilog serve"))
        .stdout(predicate::str::contains("--port <PORT>"))
        .stdout(predicate::str::contains("--templates <TEMPLATES>"));
}

#[test]
fn test_cli_analyze_help() {
    let mut cmd = Command::cargo_bin("nutrilog").unwrap();
    cmd.arg("analyze")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: nutrilog analyze [OPTIONS] <DISH>"));
}

#[test]
fn test_cli_analyze_without_key_fails() {
    let mut cmd = Command::cargo_bin("nutrilog").unwrap();
    cmd.env_remove("GEMINI_API_KEY")
        .current_dir(std::env::temp_dir())
        .args(["analyze", "カレーライス"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("APIキーを入力してください。"));
}

#[test]
fn test_cli_chat_without_key_stops() {
    let mut cmd = Command::cargo_bin("nutrilog").unwrap();
    cmd.env_remove("GEMINI_API_KEY")
        .current_dir(std::env::temp_dir())
        .arg("chat")
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("APIキーを入力してください。"));
}

#[test]
fn test_cli_no_command() {
    let mut cmd = Command::cargo_bin("nutrilog").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage: nutrilog [OPTIONS] <COMMAND>"));
}
