//! End-to-end CLI integration tests.

#![allow(clippy::expect_used)]

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn sample_markdown(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("filing.md");
    let mut file = std::fs::File::create(&path).expect("create sample file");
    writeln!(
        file,
        "# Acme Corp 2024 Annual Report\n\n## 核心结论\n\nRevenue grew steadily.\n\n## 分项分析\n\nDetails follow.\n"
    )
    .expect("write sample file");
    path
}

#[test]
fn test_chunk_markdown_writes_output_file() {
    let dir = TempDir::new().expect("tempdir");
    let input = sample_markdown(&dir);
    let output = dir.path().join("chunks.json");

    Command::cargo_bin("finreport-rs")
        .expect("binary built")
        .args([
            "chunk-markdown",
            "--input",
            input.to_str().expect("utf8 path"),
            "--output",
            output.to_str().expect("utf8 path"),
            "--company",
            "Acme Corp",
            "--code",
            "000001",
            "--period",
            "2024-12-31",
        ])
        .assert()
        .success();

    let written = std::fs::read_to_string(&output).expect("read output");
    assert!(written.contains("chunk_id"));
}

#[test]
fn test_ratios_rejects_unknown_industry() {
    Command::cargo_bin("finreport-rs")
        .expect("binary built")
        .args([
            "ratios",
            "--stock",
            "000001",
            "--period",
            "2024-12-31",
            "--industry",
            "not-an-industry",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown industry"));
}

#[test]
fn test_missing_required_argument_exits_with_usage_error() {
    Command::cargo_bin("finreport-rs")
        .expect("binary built")
        .args(["ratios", "--stock", "000001"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_help_lists_all_subcommands() {
    Command::cargo_bin("finreport-rs")
        .expect("binary built")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ingest-markdown"))
        .stdout(predicate::str::contains("chunk-markdown"))
        .stdout(predicate::str::contains("ratios"))
        .stdout(predicate::str::contains("generate-report"));
}
