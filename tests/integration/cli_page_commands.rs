#![allow(missing_docs)]

use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use heap_page::types::page::{DATA_LEN, HEADER_LEN, MAX_SPACE};
use heap_page::{HeapPage, PageId};
use serde_json::Value;
use tempfile::TempDir;

fn setup(name: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join(format!("{name}.pages"));
    cargo_bin_cmd!("hfpage")
        .args(["init", "--page", "0", "--next", "1"])
        .arg(&path)
        .assert()
        .success();
    (dir, path)
}

fn json(args: &[&str], path: &PathBuf) -> Value {
    let output = cargo_bin_cmd!("hfpage")
        .args(["--format", "json"])
        .args(args)
        .arg(path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).expect("valid json")
}

#[test]
fn insert_get_delete_round_trip() {
    let (_dir, path) = setup("roundtrip");

    let first = json(&["insert", "--text", "hello"], &path);
    assert_eq!(first["slot"], 0);
    assert_eq!(first["len"], 5);
    let second = json(&["insert", "--hex", "deadbeef"], &path);
    assert_eq!(second["slot"], 1);

    let record = json(&["get", "--slot", "0"], &path);
    assert_eq!(record["text"], "hello");
    assert_eq!(record["hex"], "68656c6c6f");
    let binary = json(&["get", "--slot", "1"], &path);
    assert_eq!(binary["hex"], "deadbeef");
    assert_eq!(binary["text"], Value::Null);

    let deleted = json(&["delete", "--slot", "0"], &path);
    assert_eq!(deleted["slot_count"], 2);

    cargo_bin_cmd!("hfpage")
        .args(["get", "--slot", "0"])
        .arg(&path)
        .assert()
        .failure();

    let bytes = fs::read(&path).expect("read page file");
    assert_eq!(bytes.len(), MAX_SPACE);
    let page = HeapPage::from_bytes(&bytes).expect("valid page");
    assert_eq!(page.next_page(), Some(PageId(1)));
    assert_eq!(page.live_record_count(), 1);
}

#[test]
fn dump_reports_slot_directory() {
    let (_dir, path) = setup("dump");
    json(&["insert", "--text", "one"], &path);
    json(&["insert", "--text", "two"], &path);
    json(&["insert", "--text", "three"], &path);
    json(&["delete", "--slot", "1"], &path);

    let dump = json(&["dump"], &path);
    assert_eq!(dump["page_no"], 0);
    assert_eq!(dump["next_page"], 1);
    assert_eq!(dump["slot_count"], 3);
    assert_eq!(dump["live_records"], 2);
    assert_eq!(dump["slots"][1]["state"], "tombstone");

    let text = cargo_bin_cmd!("hfpage")
        .arg("dump")
        .arg(&path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(text).expect("utf8");
    assert!(text.contains("slot[1] tombstone"));
}

#[test]
fn insert_into_full_page_fails() {
    let (_dir, path) = setup("full");
    let big = "z".repeat(MAX_SPACE);
    cargo_bin_cmd!("hfpage")
        .args(["insert", "--text", big.as_str()])
        .arg(&path)
        .assert()
        .failure();
}

#[test]
fn verify_flags_corrupt_pages() {
    let (_dir, path) = setup("verify");
    cargo_bin_cmd!("hfpage")
        .args(["init", "--page", "1"])
        .arg(&path)
        .assert()
        .success();
    let report = json(&["verify"], &path);
    assert_eq!(report["success"], true);
    assert_eq!(report["pages"], 2);

    let mut bytes = fs::read(&path).expect("read page file");
    // Break page 1's free-space counter.
    bytes[MAX_SPACE + 16] ^= 0x01;
    fs::write(&path, &bytes).expect("write page file");

    let output = cargo_bin_cmd!("hfpage")
        .args(["--format", "json", "verify"])
        .arg(&path)
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();
    let report: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(report["success"], false);
    assert_eq!(report["findings"][0]["page_index"], 1);
}

#[test]
fn scrub_flag_zeroes_freed_bytes_and_logs_writes() {
    let (_dir, path) = setup("scrub");
    let victim = "scrub-me-please";
    json(&["insert", "--text", victim], &path);
    json(&["insert", "--text", "xy"], &path);

    let output = cargo_bin_cmd!("hfpage")
        .env("HFPAGE_LOG", "info")
        .args(["--scrub", "delete", "--slot", "0"])
        .arg(&path)
        .assert()
        .success()
        .get_output()
        .stderr
        .clone();
    let logs = String::from_utf8(output).expect("utf8");
    assert!(logs.contains("hfpage.page.write"), "logs: {logs}");

    let bytes = fs::read(&path).expect("read page file");
    let heap_end = HEADER_LEN + DATA_LEN;
    assert_eq!(&bytes[heap_end - 2..heap_end], b"xy");
    let freed = heap_end - 2 - victim.len()..heap_end - 2;
    assert!(bytes[freed].iter().all(|b| *b == 0));
}
