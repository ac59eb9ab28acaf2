use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;

fn reqforge() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("reqforge"));
    // Keep the developer's own config out of the tests.
    cmd.env_remove("REQFORGE_CONFIG")
        .env_remove("REQFORGE_LLM_ENDPOINT")
        .env_remove("REQFORGE_LLM_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env_remove("REQFORGE_LLM_MODEL")
        .current_dir(std::env::temp_dir());
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn normalize_reads_stdin() {
    let output = reqforge()
        .args(["normalize", "--quiet"])
        .write_stdin("<think>hmm</think>```json\n{\"payloads\": [\"a\", \"b\"]}\n```")
        .output()
        .unwrap();
    assert!(output.status.success());
    let reply = stdout_json(&output);
    assert_eq!(reply["success"], true);
    assert_eq!(reply["data"]["type"], "payloadReport");
    assert_eq!(reply["data"]["payloads"][1], "b");
    assert!(reply.get("warning").is_none());
}

#[test]
fn normalize_reads_file_and_reports_free_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reply.txt");
    fs::write(&path, "I cannot help with that.").unwrap();

    let output = reqforge()
        .args(["normalize", "--file"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let reply = stdout_json(&output);
    assert_eq!(reply["data"]["type"], "freeText");
    assert_eq!(reply["data"]["message"], "I cannot help with that.");
    assert!(reply["data"]["parseError"].as_str().is_some());
}

#[test]
fn normalize_rejects_empty_input() {
    reqforge()
        .arg("normalize")
        .write_stdin("   ")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Model reply is empty"));
}

#[test]
fn send_dry_run_prints_injected_request() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("request.http");
    fs::write(
        &path,
        "GET /search?q=shoes&page=2 HTTP/1.1\r\nHost: shop.test\r\n\r\n",
    )
    .unwrap();

    reqforge()
        .args(["send", "--dry-run", "--scheme", "http", "--file"])
        .arg(&path)
        .args(["--param", "q", "--location", "query", "--payload", "<svg onload=1>"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "GET /search?q=%3Csvg+onload%3D1%3E&page=2 HTTP/1.1\r\n",
        ));
}

#[test]
fn send_requires_complete_injection_arguments() {
    reqforge()
        .args(["send", "--file", "request.http", "--param", "q"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--location"));
}

#[test]
fn ask_rejects_unknown_mode() {
    reqforge()
        .args(["ask", "--prompt", "hi", "--mode", "telepathy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown mode"));
}

#[test]
fn explicit_config_must_parse() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reqforge.toml");
    fs::write(&path, "[proxy]\ntimeout_secs = \"soon\"\n").unwrap();

    reqforge()
        .arg("--config")
        .arg(&path)
        .args(["normalize"])
        .write_stdin("{}")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config"));
}

#[test]
fn config_path_is_read_from_the_environment() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(&path, "[proxy]\ntimeout_secs = \"soon\"\n").unwrap();

    reqforge()
        .env("REQFORGE_CONFIG", &path)
        .args(["normalize"])
        .write_stdin("{}")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config"))
        .stderr(predicate::str::contains("custom.toml"));
}
