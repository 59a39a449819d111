use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const RAMEN_SHIFU: &str = "RAMEN SHIFU SEVILLA
RAMSHI SEVILLA S.L
11/01/2025  ENCARGADO SEVILLA
10 %: Base:  33,50 € Cuota: 3,35 €
Total (Impuestos Incl.) 36,85 €
";

const TOTAL_ONLY: &str = "BAR PEPE\nTOTAL A PAGAR: 12,00\n";

/// `recibo` with its user configuration directory pointed into `home`.
fn recibo(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("recibo").unwrap();
    cmd.env("HOME", home).env("XDG_CONFIG_HOME", home.join(".config"));
    cmd
}

#[test]
fn test_parse_file_to_json() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("ramen.txt");
    fs::write(&input, RAMEN_SHIFU).unwrap();

    let output = recibo(dir.path()).arg("parse").arg(&input).output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["establishment"], "RAMEN SHIFU SEVILLA");
    assert_eq!(json["date"], "2025-01-11");
    assert_eq!(json["total"], 36.85);
    assert_eq!(json["subtotal"], 33.5);
    assert_eq!(json["tax"], 3.35);
    assert_eq!(json["taxRate"], 0.1);
}

#[test]
fn test_parse_stdin() {
    let dir = TempDir::new().unwrap();

    recibo(dir.path())
        .args(["parse", "-"])
        .write_stdin(TOTAL_ONLY)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total\":12.0"))
        .stdout(predicate::str::contains("\"subtotal\":null"));
}

#[test]
fn test_parse_text_format_with_confidence() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("ramen.txt");
    fs::write(&input, RAMEN_SHIFU).unwrap();

    recibo(dir.path())
        .args(["parse", "--format", "text", "--show-confidence"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Establishment: RAMEN SHIFU SEVILLA"))
        .stdout(predicate::str::contains("Total:    36.85 €"))
        .stderr(predicate::str::contains("Extraction confidence: 100.0%"));
}

#[test]
fn test_parse_flags_low_confidence() {
    let dir = TempDir::new().unwrap();

    recibo(dir.path())
        .args(["parse", "-", "--show-confidence"])
        .write_stdin("texto ilegible")
        .assert()
        .success()
        .stderr(predicate::str::contains("Needs review"))
        .stderr(predicate::str::contains("Missing:"));
}

#[test]
fn test_parse_writes_output_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("ramen.txt");
    let output = dir.path().join("ramen.csv");
    fs::write(&input, RAMEN_SHIFU).unwrap();

    recibo(dir.path())
        .args(["parse", "--format", "csv", "--output"])
        .arg(&output)
        .arg(&input)
        .assert()
        .success();

    let csv = fs::read_to_string(&output).unwrap();
    assert!(csv.starts_with("establishment,date,total,subtotal,tax,tax_rate,confidence\n"));
    assert!(csv.contains("RAMEN SHIFU SEVILLA,2025-01-11,36.85,33.50,3.35,0.1,"));
}

#[test]
fn test_parse_missing_file() {
    let dir = TempDir::new().unwrap();

    recibo(dir.path())
        .args(["parse", "does-not-exist.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_fallback_rate_from_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, r#"{"extraction": {"fallback_tax_rate": 0.16}}"#).unwrap();

    recibo(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["parse", "-"])
        .write_stdin(TOTAL_ONLY)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"taxRate\":0.16"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, r#"{"extraction": {"fallback_tax_rate": 16}}"#).unwrap();

    recibo(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["parse", "-"])
        .write_stdin(TOTAL_ONLY)
        .assert()
        .failure()
        .stderr(predicate::str::contains("fallback tax rate"));
}

#[test]
fn test_batch_with_summary() {
    let dir = TempDir::new().unwrap();
    let inputs = dir.path().join("inputs");
    let out = dir.path().join("out");
    fs::create_dir_all(&inputs).unwrap();
    fs::write(inputs.join("ramen.txt"), RAMEN_SHIFU).unwrap();
    fs::write(inputs.join("bar.txt"), TOTAL_ONLY).unwrap();

    recibo(dir.path())
        .arg("batch")
        .arg(inputs.join("*.txt").to_str().unwrap())
        .arg("--output-dir")
        .arg(&out)
        .arg("--summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 2 files"))
        .stdout(predicate::str::contains("Processed 2 files"));

    assert!(out.join("ramen.json").exists());
    assert!(out.join("bar.json").exists());

    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("filename,status,establishment,date,total"));
    assert!(summary.contains("ramen.txt,success,RAMEN SHIFU SEVILLA,2025-01-11,36.85"));
}

#[test]
fn test_batch_continue_on_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("good.txt"), TOTAL_ONLY).unwrap();
    fs::write(dir.path().join("bad.txt"), [0xff, 0xfe, 0x00]).unwrap();
    let pattern = dir.path().join("*.txt");

    recibo(dir.path())
        .arg("batch")
        .arg(pattern.to_str().unwrap())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Processing failed"));

    recibo(dir.path())
        .arg("batch")
        .arg(pattern.to_str().unwrap())
        .arg("--continue-on-error")
        .assert()
        .success()
        .stdout(predicate::str::contains("Failed files:"));
}

#[test]
fn test_batch_without_matches() {
    let dir = TempDir::new().unwrap();
    let pattern = dir.path().join("*.txt");

    recibo(dir.path())
        .arg("batch")
        .arg(pattern.to_str().unwrap())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files"));
}

#[test]
fn test_config_init_set_get() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("recibo.json");

    recibo(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(config.exists());

    recibo(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "output.review_threshold", "0.8"])
        .assert()
        .success();

    recibo(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "get", "output.review_threshold"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.8"));

    recibo(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_set_rejects_bad_values() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("recibo.json");

    recibo(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "extraction.tolerances.reconciliation", "-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be positive"));

    recibo(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "output.no_such_key", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration key not found"));

    assert!(!config.exists());
}

#[test]
fn test_config_path_uses_user_config_dir() {
    let dir = TempDir::new().unwrap();

    recibo(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("recibo"))
        .stdout(predicate::str::contains("not created"));
}
