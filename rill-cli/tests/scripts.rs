//! Marker-driven script tests: every `tests/scripts/*.rill` file declares
//! its expected standard output and standard error in `/// OUT =` and
//! `/// ERR =` header lines, and is run through the real binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn rill_binary() -> &'static str {
    env!("CARGO_BIN_EXE_rill-cli")
}

fn go_available() -> bool {
    Command::new("go")
        .arg("version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn scripts_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/scripts")
}

/// Collect `/// OUT = ...` and `/// ERR = ...` expectations, in order.
fn expectations(contents: &str) -> (Vec<String>, Vec<String>) {
    let mut expected_out = Vec::new();
    let mut expected_err = Vec::new();
    for line in contents.lines() {
        if let Some(value) = marker_value(line, "/// OUT") {
            expected_out.push(value);
        }
        if let Some(value) = marker_value(line, "/// ERR") {
            expected_err.push(value);
        }
    }
    (expected_out, expected_err)
}

fn marker_value(line: &str, marker: &str) -> Option<String> {
    let rest = line.strip_prefix(marker)?;
    let rest = rest.trim_start();
    let value = rest.strip_prefix('=')?;
    Some(value.trim_start().to_string())
}

/// Trailing newlines are stripped before comparison; an empty stream
/// compares as no lines at all.
fn output_lines(bytes: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim_end_matches('\n');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('\n').map(str::to_string).collect()
}

#[test]
fn marker_parsing_matches_the_convention() {
    let contents = "/// OUT = hello\n/// OUT =\n/// ERR = bad thing\nfn main() { }\n";
    let (out, err) = expectations(contents);
    assert_eq!(out, vec!["hello".to_string(), String::new()]);
    assert_eq!(err, vec!["bad thing".to_string()]);
}

#[test]
fn script_expectations_hold() {
    if !go_available() {
        return;
    }
    let dir = scripts_dir();
    let mut checked = 0;
    let mut entries: Vec<_> = fs::read_dir(&dir)
        .expect("read scripts directory")
        .map(|entry| entry.expect("directory entry").path())
        .filter(|path| path.extension().map(|ext| ext == "rill").unwrap_or(false))
        .collect();
    entries.sort();

    for path in entries {
        let contents = fs::read_to_string(&path).expect("read script");
        let (expected_out, expected_err) = expectations(&contents);
        let output = Command::new(rill_binary())
            .arg(&path)
            .current_dir(&dir)
            .output()
            .expect("run script");
        assert_eq!(
            output_lines(&output.stdout),
            expected_out,
            "stdout mismatch for {}",
            path.display()
        );
        assert_eq!(
            output_lines(&output.stderr),
            expected_err,
            "stderr mismatch for {}",
            path.display()
        );
        checked += 1;
    }
    assert!(checked > 0, "no scripts were discovered");
}
