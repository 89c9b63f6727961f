#![allow(dead_code)]

pub mod fake_backend;

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub const ANON_KEY: &str = "anon-test-key";

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn sidecar_command() -> Command {
    let exe = env!("CARGO_BIN_EXE_classassistd");
    let mut cmd = Command::new(exe);
    cmd.env_remove("CLASSASSIST_BACKEND_URL")
        .env_remove("CLASSASSIST_ANON_KEY")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    cmd
}

fn start(mut cmd: Command) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let mut child = cmd.spawn().expect("spawn classassistd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

/// Sidecar with no backend configured: plans live in the workspace.
pub fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    start(sidecar_command())
}

/// Sidecar configured from the environment to talk to `url`.
pub fn spawn_sidecar_with_backend(url: &str) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let mut cmd = sidecar_command();
    cmd.env("CLASSASSIST_BACKEND_URL", url)
        .env("CLASSASSIST_ANON_KEY", ANON_KEY);
    start(cmd)
}

/// Closes stdin and waits, so the next sidecar sees everything persisted.
pub fn shutdown(mut child: Child, stdin: ChildStdin) {
    drop(stdin);
    let status = child.wait().expect("wait for sidecar");
    assert!(status.success(), "sidecar exited with {status}");
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

/// Returns the `error` object of a response that must have failed.
pub fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value.get("error").cloned().expect("error object")
}

pub fn error_code(error: &serde_json::Value) -> &str {
    error.get("code").and_then(|v| v.as_str()).unwrap_or("")
}
