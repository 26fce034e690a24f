//! End-to-end runs of the `idlkit` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const COUNTER_IDL: &str = include_str!("../../idlkit-core/tests/fixtures/counter.json");

fn write_idl(dir: &Path) -> PathBuf {
    let path = dir.join("counter.json");
    std::fs::write(&path, COUNTER_IDL).unwrap_or_else(|err| panic!("failed to write idl: {err}"));
    path
}

fn idlkit(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_idlkit"))
        .args(args)
        .env_remove("IDLKIT_IDL")
        .env_remove("IDLKIT_LOG")
        .output()
        .unwrap_or_else(|err| panic!("failed to execute idlkit binary: {err}"))
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "expected success, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[test]
fn discriminator_command_prints_hex_and_bytes() {
    let out = stdout(&idlkit(&["discriminator", "account", "Data"]));
    assert_eq!(out, "ce9c3bbc124ff0e8\n[206, 156, 59, 188, 18, 79, 240, 232]");
}

#[test]
fn encode_then_decode() {
    let dir = tempfile::tempdir().unwrap();
    let idl = write_idl(dir.path());
    let idl = idl.to_str().unwrap();

    let hex = stdout(&idlkit(&[
        "encode",
        "--idl",
        idl,
        "account",
        "Data",
        r#"{"id": 123, "name": "test", "isActive": true}"#,
    ]));
    assert_eq!(hex, "01020304050607087b00000000000000040000007465737401");

    let json = stdout(&idlkit(&["decode", "--idl", idl, "account", &hex]));
    let json: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(json["name"], "Data");
    assert_eq!(json["data"]["id"], 123);
}

#[test]
fn idl_path_from_environment() {
    let dir = tempfile::tempdir().unwrap();
    let idl = write_idl(dir.path());
    let output = Command::new(env!("CARGO_BIN_EXE_idlkit"))
        .args(["size", "Data"])
        .env("IDLKIT_IDL", &idl)
        .output()
        .unwrap();
    assert_eq!(stdout(&output), "18");
}

#[test]
fn mismatched_data_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let idl = write_idl(dir.path());
    let output = idlkit(&[
        "decode",
        "--idl",
        idl.to_str().unwrap(),
        "account",
        "Data",
        "63626160",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

#[test]
fn pda_command_prints_json() {
    let out = stdout(&idlkit(&[
        "pda",
        "--program",
        "US517G5965aydkZ46HS38QLi7UQiSojurfbQfKCELFx",
        "--seed",
        "string:vault",
        "--seed",
        "u16:2",
    ]));
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert!(json["address"].is_string());
    assert!(json["bump"].is_u64());
    assert_eq!(json["seeds"], serde_json::json!(["7661756c74", "0200"]));
}

#[test]
fn missing_idl_file_fails() {
    let output = idlkit(&["size", "--idl", "/nonexistent/idl.json", "Data"]);
    assert_eq!(output.status.code(), Some(1));
}
