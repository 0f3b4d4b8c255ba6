//! Golden tests for the JSON output of the akv binary
//!
//! Each test points `--binary` at a shell script that prints canned tool
//! output, so no storage node or ledger is needed.
//!
//! Run with: `cargo test --features golden`

#![cfg(all(feature = "golden", unix))]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const STUB: &str = r#"#!/bin/sh
# $1 is "ipc", then noun, verb and positional arguments
case "$2 $3" in
  "bucket create") echo "Bucket created: Name=$4, Created=2024-11-05T10:00:00Z" ;;
  "bucket delete") echo "Bucket deleted: Name=$4" ;;
  "bucket view")   echo '{"error":"bucket not found"}'; exit 1 ;;
  "bucket list")
    echo "Bucket: Name=alpha, Created=2024-11-05T10:00:00Z"
    echo "Bucket: Name=beta, Created=2024-11-06T10:00:00Z" ;;
  "file list")     echo "File: Name=a.bin, Size=2048" ;;
  "file info")     echo "garbled" ;;
  "file upload")
    echo "uploading chunk 1/1"
    echo "File uploaded successfully: Name=$(basename "$5"), Size=4" ;;
  "file download") printf 'payload' > "$6/$5" ;;
  *) echo "unknown command" >&2; exit 2 ;;
esac
"#;

struct Env {
    dir: TempDir,
    stub: PathBuf,
}

impl Env {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let stub = dir.path().join("akavecli-stub");
        std::fs::write(&stub, STUB).expect("Failed to write stub");
        std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to mark stub executable");
        Self { dir, stub }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_akv"))
            .args(args)
            .args(["--json", "--binary"])
            .arg(&self.stub)
            .args(["--node-address", "127.0.0.1:5500", "--private-key", "secret"])
            .env("AKV_CONFIG_DIR", self.path().join("config"))
            .env_remove("ACCOUNT_ADDRESS")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute akv")
    }
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("Output should be valid JSON")
}

#[test]
fn test_bucket_create_json() {
    let env = Env::new();
    let output = env.run(&["bucket", "create", "photos"]);
    assert!(output.status.success());

    insta::assert_json_snapshot!(stdout_json(&output), @r#"
    {
      "operation": "create_bucket",
      "result": {
        "data": {
          "Created": "2024-11-05T10:00:00Z",
          "Name": "photos"
        },
        "kind": "bucket"
      },
      "success": true
    }
    "#);
}

#[test]
fn test_bucket_list_json() {
    let env = Env::new();
    let output = env.run(&["bucket", "list"]);
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["result"]["kind"], "bucket_list");
    let names: Vec<&str> = json["result"]["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["Name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["alpha", "beta"]);
}

#[test]
fn test_bucket_delete_json() {
    let env = Env::new();
    let output = env.run(&["bucket", "delete", "photos"]);
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["result"]["kind"], "deletion");
    assert_eq!(json["result"]["data"]["Name"], "photos");
}

#[test]
fn test_error_payload_exit_code() {
    let env = Env::new();
    let output = env.run(&["bucket", "view", "missing"]);
    assert_eq!(output.status.code(), Some(5));

    let json = stdout_json(&output);
    assert_eq!(json["success"], false);
    assert_eq!(json["result"]["kind"], "error_payload");
    assert_eq!(json["result"]["data"]["error"], "bucket not found");
}

#[test]
fn test_unrecognised_output_exit_code() {
    let env = Env::new();
    let output = env.run(&["file", "info", "b", "a.bin"]);
    assert_eq!(output.status.code(), Some(4));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("garbled"));
}

#[test]
fn test_file_upload_json() {
    let env = Env::new();
    let local = env.path().join("notes.txt");
    std::fs::write(&local, b"abcd").unwrap();

    let output = env.run(&["file", "upload", "b", local.to_str().unwrap()]);
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["operation"], "upload_file");
    assert_eq!(json["result"]["kind"], "upload");
    assert_eq!(json["result"]["data"]["Name"], "notes.txt");
}

#[test]
fn test_file_download_passthrough() {
    let env = Env::new();
    let dest = env.path().join("out");

    let output = env.run(&["file", "download", "b", "a.bin", "-o", dest.to_str().unwrap()]);
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["result"]["kind"], "raw_passthrough");
    assert_eq!(json["result"]["data"]["sizeBytes"], 7);
    assert_eq!(std::fs::read(dest.join("a.bin")).unwrap(), b"payload");
}

#[test]
fn test_missing_tool_exit_code() {
    let env = Env::new();
    let output = Command::new(env!("CARGO_BIN_EXE_akv"))
        .args(["bucket", "list", "--json", "--binary"])
        .arg(env.path().join("does-not-exist"))
        .args(["--node-address", "n:5500", "--private-key", "k"])
        .env("AKV_CONFIG_DIR", env.path().join("config"))
        .env_remove("ACCOUNT_ADDRESS")
        .output()
        .expect("Failed to execute akv");
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_config_show_masks_key() {
    let env = Env::new();
    let output = env.run(&["config", "show"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("secret"));
    let json = stdout_json(&output);
    assert_eq!(json["privateKey"], "***");
    assert_eq!(json["nodeAddress"], "127.0.0.1:5500");
}
