use std::{
    path::PathBuf,
    process::{Command, Output, Stdio},
};

fn bin_path() -> &'static str {
    env!("CARGO_BIN_EXE_brs-lang")
}

fn script(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("scripts");
    path.push(name);
    path.to_string_lossy().into_owned()
}

fn brs(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("BRS_ENTRY_POINT")
        .env_remove("BRS_MAX_CALL_DEPTH")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("failed to run brs-lang")
}

#[test]
fn run_prints_script_output() {
    let output = brs(&["run", &script("hello.brs")]);
    assert!(
        output.status.success(),
        "run failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(String::from_utf8_lossy(&output.stdout), "hello, world\n");
}

#[test]
fn crash_reports_backtrace_and_fails() {
    let output = brs(&["run", &script("crash.brs")]);
    assert!(!output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "before\n");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Divide by Zero."), "{}", stderr);
    assert!(stderr.contains("BackTrace:"), "{}", stderr);
    assert!(stderr.contains("Function divide("), "{}", stderr);
}

#[test]
fn check_reports_syntax_errors() {
    let output = brs(&["check", &script("broken.brs")]);
    assert!(!output.status.success());
    assert!(!output.stderr.is_empty());
    let clean = brs(&["check", &script("hello.brs")]);
    assert!(clean.status.success());
    assert!(clean.stdout.is_empty());
}

#[test]
fn invalid_configuration_is_rejected() {
    let output = Command::new(bin_path())
        .args(["run", &script("hello.brs")])
        .env("BRS_MAX_CALL_DEPTH", "zero")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("failed to run brs-lang");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("BRS_MAX_CALL_DEPTH"));
}

#[test]
fn usage_errors_exit_non_zero() {
    assert!(!brs(&[]).status.success());
    assert!(!brs(&["run", "script.txt"]).status.success());
    assert!(!brs(&["launch", &script("hello.brs")]).status.success());
}
