//! CLI integration tests: exercise the binary as a subprocess.

use std::io;
use std::process::{Command, Output};

fn run_cli(args: &[&str]) -> io::Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_otlp-relay"))
        .args(args)
        .env_remove("RELAY_QUEUE_BACKEND")
        .env_remove("RELAY_QUEUE_DURABLE_PATH")
        .env_remove("RELAY_EXPORTER_ENDPOINT")
        .output()
}

#[test]
fn info_text_output_reports_build_fields() -> io::Result<()> {
    let output = run_cli(&["info"])?;
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("status: ok"));
    assert!(stdout.contains("version:"));
    Ok(())
}

#[test]
fn info_json_output_has_build_object() -> io::Result<()> {
    let output = run_cli(&["--output", "json", "info"])?;
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout)
        .map_err(|error| io::Error::other(error.to_string()))?;
    assert_eq!(value["status"], "ok");
    assert!(value["build"]["name"].is_string());
    Ok(())
}

#[test]
fn enqueue_rejects_invalid_json_payload() -> io::Result<()> {
    let output = run_cli(&["enqueue", "--message", "{not json"])?;
    assert_eq!(output.status.code(), Some(2));
    Ok(())
}

#[test]
fn enqueue_rejects_non_object_json_payload() -> io::Result<()> {
    let output = run_cli(&["enqueue", "--message", "[1,2,3]"])?;
    assert_eq!(output.status.code(), Some(2));
    Ok(())
}

#[test]
fn enqueue_accepts_a_well_formed_record_against_the_default_memory_queue() -> io::Result<()> {
    let output = run_cli(&["enqueue", "--message", r#"{"message":"hello"}"#])?;
    assert!(output.status.success(), "stderr: {:?}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("status: ok"));
    Ok(())
}

#[test]
fn run_rejects_an_unrecognized_config_format_before_starting_the_loop() -> io::Result<()> {
    let output = run_cli(&["run", "--config", "/nonexistent.cfg", "--format", "yaml"])?;
    assert_eq!(output.status.code(), Some(2));
    Ok(())
}
