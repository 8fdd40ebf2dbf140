mod common;

use assert_cmd::Command;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn betaviz() -> Command {
    let mut cmd = Command::cargo_bin("betaviz").unwrap();
    cmd.env("BETAVIZ_QUIET", "1").env_remove("BETAVIZ_CONFIG");
    cmd
}

#[test]
fn test_init_writes_config_and_refuses_overwrite() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/.betaviz.toml");

    betaviz()
        .arg("init")
        .arg("--config")
        .arg(&path)
        .assert()
        .success();
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("[study]"));

    betaviz()
        .arg("init")
        .arg("--config")
        .arg(&path)
        .assert()
        .failure();

    betaviz()
        .args(["init", "--force", "--config"])
        .arg(&path)
        .assert()
        .success();
}

#[test]
fn test_derive_writes_table() {
    let dir = TempDir::new().unwrap();
    let config = common::write_study(dir.path());
    let output = dir.path().join("out/derived.csv");

    betaviz()
        .arg("--config")
        .arg(&config)
        .arg("derive")
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let table = std::fs::read_to_string(&output).unwrap();
    let mut lines = table.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("participant,scenario,vis,arrival,trial,trial_normalized"));
    assert!(header.ends_with(
        "displayed_interval_85,displayed_interval_60,displayed_interval_99"
    ));
    assert_eq!(lines.count(), 6);
}

#[test]
fn test_import_then_analyze_as_json() {
    let dir = TempDir::new().unwrap();
    let config = common::write_study(dir.path());
    let draws = dir.path().join("draws.csv");
    std::fs::write(&draws, common::draws_csv()).unwrap();

    betaviz()
        .arg("--config")
        .arg(&config)
        .arg("fit")
        .arg("--from-draws")
        .arg(&draws)
        .assert()
        .success();
    assert!(dir.path().join("models/fit.bin").exists());

    let output = betaviz()
        .arg("--config")
        .arg(&config)
        .args(["analyze", "--format", "json", "--policy", "cache-only", "--no-figures"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["provenance"]["source"], "loaded");
    assert_eq!(report["baseline"], "bars");
    assert_eq!(report["best"], "hops");
    assert_eq!(report["n_draws"], 4);
    assert!(!dir.path().join("figures").exists());
}

#[test]
fn test_analyze_reports_missing_engine() {
    let dir = TempDir::new().unwrap();
    let config = common::write_study(dir.path());

    betaviz()
        .arg("--config")
        .arg(&config)
        .args(["analyze", "--no-figures"])
        .assert()
        .failure();
}
