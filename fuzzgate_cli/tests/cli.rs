#![cfg(unix)]

use std::io::{BufRead, BufReader, Read, Write};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn get_test_engine_path(name: &str) -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir.join("../test_engines").join(name)
}

/// Config that routes the engine through one of the fake `cargo fuzz` scripts.
fn engine_config(script: &str) -> tempfile::NamedTempFile {
    let script_path = get_test_engine_path(script);
    if !script_path.exists() {
        panic!("Test engine missing: {script_path:?}");
    }
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[engine]\nprogram = \"sh\"\nprefix-args = [{:?}]",
        script_path.to_str().unwrap()
    )
    .unwrap();
    file
}

fn fuzzgate(config: &tempfile::NamedTempFile, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fuzzgate"))
        .arg("--config-file")
        .arg(config.path())
        .args(args)
        .output()
        .unwrap()
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn lists_targets_in_engine_order() {
    let config = engine_config("fake_cargo_fuzz.sh");
    let output = fuzzgate(&config, &[]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr_of(&output));
    assert_eq!(stdout_of(&output), "parse_header\ndecode_frame\n");
}

#[test]
fn listing_twice_is_identical() {
    let config = engine_config("fake_cargo_fuzz.sh");
    let first = fuzzgate(&config, &[]);
    let second = fuzzgate(&config, &[]);
    assert_eq!(first.stdout, second.stdout);
    assert_eq!(first.status.code(), second.status.code());
}

#[test]
fn empty_project_lists_nothing() {
    let config = engine_config("empty_project.sh");
    let output = fuzzgate(&config, &[]);
    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
}

#[test]
fn unconfigured_project_exits_with_catalog_unavailable() {
    let config = engine_config("unconfigured_project.sh");
    let output = fuzzgate(&config, &[]);
    assert_eq!(output.status.code(), Some(5));
    assert!(output.stdout.is_empty());
    assert!(stderr_of(&output).contains("CatalogUnavailable"));
}

#[test]
fn clean_run_exits_zero() {
    let config = engine_config("fake_cargo_fuzz.sh");
    let output = fuzzgate(&config, &["parse_header"]);
    let stderr = stderr_of(&output);
    assert_eq!(output.status.code(), Some(0), "stderr: {stderr}");
    assert!(!stderr.contains("Failing input"));
    assert!(stderr.contains("-ignore_crashes=0"), "stop flags missing: {stderr}");
}

#[test]
fn crash_exits_with_failure_detected_after_a_single_run() {
    let config = engine_config("fake_cargo_fuzz.sh");
    let output = fuzzgate(&config, &["decode_frame"]);
    let stderr = stderr_of(&output);
    assert_eq!(output.status.code(), Some(1), "stderr: {stderr}");
    assert!(stderr.contains("FailureDetected"), "stderr: {stderr}");
    assert_eq!(stderr.matches("INFO: engine args:").count(), 1);
}

#[test]
fn unknown_target_reports_engine_diagnostic_unmodified() {
    let config = engine_config("fake_cargo_fuzz.sh");
    let output = fuzzgate(&config, &["missing_target"]);
    let stderr = stderr_of(&output);
    assert_eq!(output.status.code(), Some(3), "stderr: {stderr}");
    let (_, summary) = stderr
        .split_once("fuzzgate: EngineNonFailureError:")
        .unwrap_or_else(|| panic!("categorized message missing: {stderr}"));
    assert!(
        summary.contains("error: no bin target named `missing_target`"),
        "summary: {summary}"
    );
    assert!(!summary.contains("failed to build fuzz script"), "summary: {summary}");
}

#[test]
fn interrupt_relays_engine_shutdown_report() {
    let config = engine_config("fake_cargo_fuzz.sh");
    let mut child = Command::new(env!("CARGO_BIN_EXE_fuzzgate"))
        .arg("--config-file")
        .arg(config.path())
        .arg("interruptible")
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .process_group(0)
        .spawn()
        .unwrap();

    let mut stderr = BufReader::new(child.stderr.take().unwrap());
    let mut seen = String::new();
    loop {
        let mut line = String::new();
        if stderr.read_line(&mut line).unwrap() == 0 {
            panic!("engine never started: {seen}");
        }
        seen.push_str(&line);
        if line.contains("INFO: running") {
            break;
        }
    }

    // Ctrl-C in a terminal signals the whole foreground process group.
    let status = Command::new("kill")
        .arg("-INT")
        .arg(format!("-{}", child.id()))
        .status()
        .unwrap();
    assert!(status.success());

    stderr.read_to_string(&mut seen).unwrap();
    let exit = child.wait().unwrap();
    assert_eq!(exit.code(), Some(3), "stderr: {seen}");
    assert!(seen.contains("libFuzzer: run interrupted; exiting"), "stderr: {seen}");
    assert!(seen.contains("fuzzgate: run interrupted"), "stderr: {seen}");
    assert!(
        seen.contains("fuzzgate: EngineNonFailureError: fuzzing engine exited with exit code 72"),
        "stderr: {seen}"
    );
}

#[test]
fn forwarded_engine_args_reach_the_engine() {
    let config = engine_config("fake_cargo_fuzz.sh");
    let output = fuzzgate(&config, &["parse_header", "--", "-max_total_time=5"]);
    assert_eq!(output.status.code(), Some(0));
    let stderr = stderr_of(&output);
    assert!(
        stderr.contains("parse_header -- -ignore_crashes=0 -ignore_timeouts=0 -ignore_ooms=0 -max_total_time=5"),
        "stderr: {stderr}"
    );
}

#[test]
fn missing_engine_exits_with_launch_error() {
    let mut config = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        config,
        "[engine]\nprogram = \"./this_engine_does_not_exist_ever_12345\""
    )
    .unwrap();
    let output = fuzzgate(&config, &["decode_frame"]);
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr_of(&output).contains("EngineLaunchError"));
}

#[test]
fn blank_target_is_a_usage_error() {
    let config = engine_config("fake_cargo_fuzz.sh");
    let output = fuzzgate(&config, &["   "]);
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
}

#[test]
fn malformed_config_exits_with_config_error() {
    let mut config = tempfile::NamedTempFile::new().unwrap();
    writeln!(config, "[engine]\nprogramme = \"cargo\"").unwrap();
    let output = fuzzgate(&config, &[]);
    assert_eq!(output.status.code(), Some(6));
    assert!(stderr_of(&output).contains("configuration error"));
}
