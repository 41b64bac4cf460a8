use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

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

fn run_script(dir: &Path, name: &str, contents: &str) -> Output {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write script");
    Command::new(rill_binary())
        .arg(&path)
        .current_dir(dir)
        .output()
        .expect("run rill-cli")
}

#[test]
fn reports_diagnostics_with_positions_and_empty_stdout() {
    let tmp = tempdir().expect("tempdir");
    let output = run_script(tmp.path(), "bad.rill", "fn main() { print(x) }\n");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty(), "stdout should be empty on error");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("bad.rill:0:"),
        "diagnostic should carry path:line:col, got: {stderr}"
    );
    assert!(stderr.contains("use of undeclared variable"));
}

#[test]
fn debug_flag_dumps_artifacts_to_stderr() {
    if !go_available() {
        return;
    }
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("ok.rill");
    fs::write(&path, "fn main() { x = 1 print(x) }\n").expect("write script");
    let output = Command::new(rill_binary())
        .arg("--debug")
        .arg(&path)
        .current_dir(tmp.path())
        .output()
        .expect("run rill-cli");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Program"), "AST dump missing: {stderr}");
    assert!(stderr.contains("GENERATED CODE:"));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "1\n");
}

#[test]
fn arithmetic_prints_seven() {
    if !go_available() {
        return;
    }
    let tmp = tempdir().expect("tempdir");
    let output = run_script(tmp.path(), "e1.rill", "fn main() { x = 1 + 2 * 3  print(x) }\n");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "7\n");
}

#[test]
fn range_loop_prints_inclusive_bounds() {
    if !go_available() {
        return;
    }
    let tmp = tempdir().expect("tempdir");
    let output = run_script(
        tmp.path(),
        "e2.rill",
        "fn main() { for 1..3 -> i { print(i) } }\n",
    );
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "1\n2\n3\n");
}

#[test]
fn join_prints_separated_elements() {
    if !go_available() {
        return;
    }
    let tmp = tempdir().expect("tempdir");
    let output = run_script(
        tmp.path(),
        "e3.rill",
        "fn main() { xs = [1, 2, 3]  print(join(xs, \"-\")) }\n",
    );
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "1-2-3\n");
}

#[test]
fn fallible_propagation_exits_nonzero_with_clean_stdout() {
    if !go_available() {
        return;
    }
    let tmp = tempdir().expect("tempdir");
    let output = run_script(
        tmp.path(),
        "e4.rill",
        "fn parse?(s str) -> int { return stringToInt(s) }\nfn main() { n = parse(\"abc\")? print(n) }\n",
    );
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(!output.stderr.is_empty());
}

#[test]
fn inline_error_handler_recovers() {
    if !go_available() {
        return;
    }
    let tmp = tempdir().expect("tempdir");
    let output = run_script(
        tmp.path(),
        "e5.rill",
        "fn parse?(s str) -> int { return stringToInt(s) }\nfn main() { n = parse(\"abc\")? { print(\"boom\") } }\n",
    );
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "boom\n");
}

#[test]
fn read_generator_streams_lines() {
    if !go_available() {
        return;
    }
    let tmp = tempdir().expect("tempdir");
    fs::write(tmp.path().join("t.txt"), "a\nb\n").expect("write data file");
    let output = run_script(
        tmp.path(),
        "e6.rill",
        "fn main() { for read(\"t.txt\") -> line { print(line) } }\n",
    );
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "a\nb\n");
}

#[test]
fn set_membership_prints_booleans() {
    if !go_available() {
        return;
    }
    let tmp = tempdir().expect("tempdir");
    let output = run_script(
        tmp.path(),
        "e7.rill",
        "fn main() { s = set{1, 2, 2, 3}  print(has(s, 2))  print(has(s, 4)) }\n",
    );
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "true\nfalse\n");
}
