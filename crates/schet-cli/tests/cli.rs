//! Command-line behaviour of the `schet` binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn schet() -> Command {
    Command::cargo_bin("schet").unwrap()
}

/// Config file with OCR switched off so runs never touch an external engine.
fn text_only_config(dir: &Path) -> String {
    let path = dir.join("config.json");
    fs::write(&path, r#"{"ocr": {"enabled": false}}"#).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_help_lists_subcommands() {
    schet()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_process_rejects_non_pdf() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("invoice.docx");
    fs::write(&input, "Счет № 1").unwrap();

    schet()
        .arg("process")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Only PDF files are supported"));
}

#[test]
fn test_process_missing_file() {
    let dir = TempDir::new().unwrap();

    schet()
        .arg("process")
        .arg(dir.path().join("nope.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_process_empty_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("empty.pdf");
    fs::write(&input, "").unwrap();

    schet()
        .arg("process")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("File is empty"));
}

#[test]
fn test_process_unreadable_document() {
    let dir = TempDir::new().unwrap();
    let config = text_only_config(dir.path());
    let input = dir.path().join("broken.pdf");
    fs::write(&input, "this is not a pdf").unwrap();

    schet()
        .args(["--config", &config, "process"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not read document"));
}

#[test]
fn test_batch_without_matches() {
    let dir = TempDir::new().unwrap();
    let pattern = dir.path().join("*.pdf");

    schet()
        .arg("batch")
        .arg(pattern.to_string_lossy().as_ref())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files found"));
}

#[test]
fn test_batch_continues_on_error_and_writes_summary() {
    let dir = TempDir::new().unwrap();
    let config = text_only_config(dir.path());
    let inputs = dir.path().join("in");
    let out = dir.path().join("out");
    fs::create_dir_all(&inputs).unwrap();
    fs::write(inputs.join("a.pdf"), "garbage").unwrap();
    fs::write(inputs.join("b.pdf"), "more garbage").unwrap();

    schet()
        .args(["--config", &config, "batch"])
        .arg(inputs.join("*.pdf").to_string_lossy().as_ref())
        .arg("--output-dir")
        .arg(&out)
        .args(["--continue-on-error", "--summary", "-j", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 2 files"))
        .stdout(predicate::str::contains("Failed files:"));

    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    assert_eq!(summary.lines().count(), 3);
    assert!(summary.contains("a.pdf,error"));
}

#[test]
fn test_batch_stops_on_first_error() {
    let dir = TempDir::new().unwrap();
    let config = text_only_config(dir.path());
    fs::write(dir.path().join("only.pdf"), "garbage").unwrap();

    schet()
        .args(["--config", &config, "batch"])
        .arg(dir.path().join("*.pdf").to_string_lossy().as_ref())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Processing failed"));
}

#[test]
fn test_config_get_defaults() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("missing.json");

    schet()
        .arg("--config")
        .arg(&config)
        .args(["config", "get", "cache.capacity"])
        .assert()
        .success()
        .stdout(predicate::str::contains("50"));

    schet()
        .arg("--config")
        .arg(&config)
        .args(["config", "get", "extraction.sentinel"])
        .assert()
        .success()
        .stdout(predicate::str::contains("НЕ_РАСПОЗНАНО"));
}

#[test]
fn test_config_init_set_get() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("nested").join("config.json");

    schet()
        .arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(config.exists());

    schet()
        .arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    schet()
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "cache.capacity", "7"])
        .assert()
        .success();

    schet()
        .arg("--config")
        .arg(&config)
        .args(["config", "get", "cache.capacity"])
        .assert()
        .success()
        .stdout(predicate::str::contains("7"));
}

#[test]
fn test_config_unknown_key() {
    let dir = TempDir::new().unwrap();

    schet()
        .arg("--config")
        .arg(dir.path().join("config.json"))
        .args(["config", "get", "cache.size"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration key not found"));
}

#[test]
fn test_config_path_reports_status() {
    let dir = TempDir::new().unwrap();

    schet()
        .arg("--config")
        .arg(dir.path().join("config.json"))
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not created"));
}
