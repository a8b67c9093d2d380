//! Integration tests for the `cp949-codec` binary

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

const LISTING: &str = "\
#
#    Name:             cp949 to Unicode table (excerpt)
#
0x41\t0x0041\t#LATIN CAPITAL LETTER A
0x80\t      \t#UNDEFINED
0xA1A4\t0x00B7\t#MIDDLE DOT
0xB0A1\t0xAC00\t#HANGUL SYLLABLE KIYEOK A
0xB0A2\t0xAC01\t#HANGUL SYLLABLE KIYEOK A KIYEOK
0xC7D1\t0xD55C\t#HANGUL SYLLABLE HIEUH A NIEUN
";

fn cmd() -> Command {
    Command::cargo_bin("cp949-codec").unwrap()
}

/// Compile the listing into `dir/cp949.dat` with the CLI itself
fn build_table(dir: &Path) -> PathBuf {
    let listing = dir.join("CP949.TXT");
    let table = dir.join("cp949.dat");
    std::fs::write(&listing, LISTING).unwrap();
    cmd()
        .arg("build-table")
        .arg("-i")
        .arg(&listing)
        .arg("-o")
        .arg(&table)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 4 code pairs"));
    table
}

#[test]
fn decode_stdin_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let table = build_table(dir.path());

    cmd()
        .arg("--table")
        .arg(&table)
        .arg("decode")
        .write_stdin(vec![b'[', 0xB0, 0xA1, 0xC7, 0xD1, 0xFF, 0xFF, b']'])
        .assert()
        .success()
        .stdout("[가한\u{FFFD}]");
}

#[test]
fn encode_file_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let table = build_table(dir.path());
    let input = dir.path().join("in.txt");
    let output = dir.path().join("out.bin");
    std::fs::write(&input, "각·x😀").unwrap();

    cmd()
        .arg("--table")
        .arg(&table)
        .arg("encode")
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    assert_eq!(
        std::fs::read(&output).unwrap(),
        vec![0xB0, 0xA2, 0xA1, 0xA4, b'x', b'?']
    );
}

#[test]
fn convert_through_registry_alias() {
    let dir = tempfile::tempdir().unwrap();
    let table = build_table(dir.path());

    cmd()
        .arg("--table")
        .arg(&table)
        .args(["convert", "-f", "UTF-8", "-t", "UHC"])
        .write_stdin("가")
        .assert()
        .success()
        .stdout(vec![0xB0u8, 0xA1]);
}

#[test]
fn convert_rejects_unknown_encoding() {
    cmd()
        .args(["convert", "-f", "koi8-r", "-t", "utf-8"])
        .write_stdin("x")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown encoding: koi8-r"));
}

#[test]
fn info_reports_table_statistics() {
    let dir = tempfile::tempdir().unwrap();
    let table = build_table(dir.path());

    let output = cmd()
        .arg("--table")
        .arg(&table)
        .args(["--format", "json", "info"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let info: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(info["stats"]["pairs"], 4);
    assert_eq!(info["stats"]["native_range"][0], 0xA1A4);
    assert_eq!(info["stats"]["native_range"][1], 0xC7D1);
    assert_eq!(info["stats"]["scalar_range"][1], 0xD55C);
}

#[test]
fn config_file_supplies_table_path() {
    let dir = tempfile::tempdir().unwrap();
    let table = build_table(dir.path());
    let config = dir.path().join("codec.json");
    std::fs::write(
        &config,
        serde_json::json!({ "table_path": table, "buffer_size": 16 }).to_string(),
    )
    .unwrap();

    cmd()
        .arg("--config")
        .arg(&config)
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("Mapped codes: 4"));
}

#[test]
fn missing_table_fails() {
    let dir = tempfile::tempdir().unwrap();

    cmd()
        .arg("--table")
        .arg(dir.path().join("absent.dat"))
        .arg("decode")
        .write_stdin("x")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load decode table"));
}

#[test]
fn list_includes_cp949() {
    cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("cp949").and(predicate::str::contains("uhc")));
}

#[test]
fn build_table_rejects_bad_listing() {
    let dir = tempfile::tempdir().unwrap();
    let listing = dir.path().join("bad.txt");
    std::fs::write(&listing, "0xB0A1\tAC00\n").unwrap();

    cmd()
        .arg("build-table")
        .arg("-i")
        .arg(&listing)
        .arg("-o")
        .arg(dir.path().join("out.dat"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("mapping line 1"));
}

#[test]
fn build_table_rejects_remapped_native_code() {
    let dir = tempfile::tempdir().unwrap();
    let listing = dir.path().join("dup.txt");
    let table = dir.path().join("out.dat");
    std::fs::write(&listing, "0xB0A1\t0xAC00\n0xB0A1\t0xAC01\n").unwrap();

    cmd()
        .arg("build-table")
        .arg("-i")
        .arg(&listing)
        .arg("-o")
        .arg(&table)
        .assert()
        .failure()
        .stderr(predicate::str::contains("mapping line 2"))
        .stderr(predicate::str::contains("already mapped on line 1"));

    assert!(!table.exists());
}

#[test]
fn oversized_buffer_is_rejected() {
    cmd()
        .args(["--buffer-size", "18014398509481984", "encode"])
        .write_stdin("x")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("too large"));

    cmd()
        .args(["--buffer-size", "1048576", "encode"])
        .write_stdin("x")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("exceeds the maximum"));
}

#[test]
fn invalid_environment_does_not_fall_back_to_default_table() {
    let dir = tempfile::tempdir().unwrap();
    let table = build_table(dir.path());

    cmd()
        .env("CP949_TABLE", &table)
        .env("CP949_BUFFER_SIZE", "2")
        .current_dir(dir.path())
        .arg("decode")
        .write_stdin("x")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid environment configuration"));
}
