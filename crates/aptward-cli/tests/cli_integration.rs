//! CLI subprocess integration tests.
//!
//! These tests invoke the `aptward` binary as a subprocess and verify exit
//! codes, stdout content, and JSON output stability. `exec` runs `sh` in
//! place of the package tool.

use fs2::FileExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

const EXIT_FAILURE: i32 = 1;
const EXIT_LOCKED: i32 = 2;
const EXIT_CLASSIFIED: i32 = 3;

fn aptward_bin(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_aptward"));
    cmd.env("HOME", home)
        .env_remove("APTWARD_CONFIG")
        .env_remove("APTWARD_LOG")
        .env("APTWARD_SKIP_PREREQS", "1");
    cmd
}

/// Config running `sh` with no extra options, guarded by `dir/lock`.
fn write_sh_config(dir: &Path) -> PathBuf {
    let path = dir.join("config.toml");
    let lock = dir.join("lock");
    std::fs::write(
        &path,
        format!(
            r#"[tool]
program = "sh"
options = {{}}

[lock]
paths = ["{}"]
"#,
            lock.display()
        ),
    )
    .unwrap();
    path
}

fn parse_json(stdout: &[u8]) -> serde_json::Value {
    let text = String::from_utf8_lossy(stdout);
    serde_json::from_str(&text)
        .unwrap_or_else(|e| panic!("output must be valid JSON: {e}\nstdout: {text}"))
}

#[test]
fn cli_version_exits_zero() {
    let home = tempfile::tempdir().unwrap();
    let output = aptward_bin(home.path()).arg("--version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("aptward"));
}

#[test]
fn cli_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    let output = aptward_bin(home.path()).arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["classify", "exec", "lock-status", "catalog", "completions"] {
        assert!(stdout.contains(command), "help must list '{command}'");
    }
}

#[test]
fn cli_classify_file_json() {
    let home = tempfile::tempdir().unwrap();
    let log = home.path().join("apt.log");
    std::fs::write(
        &log,
        "Reading Package Lists...\nE: Couldn't find package vim\nE: Broken packages\n",
    )
    .unwrap();

    let output = aptward_bin(home.path())
        .args(["--json", "classify", &log.to_string_lossy()])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "classify must exit 0. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let parsed = parse_json(&output.stdout);
    assert_eq!(parsed["code"], "PackageNotFound");
    assert_eq!(parsed["params"][0], "vim");
    assert_eq!(parsed["source"], "user_input");
    assert_eq!(parsed["critical"], true);
}

#[test]
fn cli_classify_all_keeps_line_order() {
    let home = tempfile::tempdir().unwrap();
    let log = home.path().join("apt.log");
    std::fs::write(&log, "E: Broken packages\nsome noise\nE: Couldn't find package vim\n").unwrap();

    let output = aptward_bin(home.path())
        .args(["--json", "classify", "--all", &log.to_string_lossy()])
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed = parse_json(&output.stdout);
    let arr = parsed.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["code"], "BrokenPackages");
    assert_eq!(arr[1]["code"], "PackageNotFound");
}

#[test]
fn cli_classify_reads_stdin() {
    let home = tempfile::tempdir().unwrap();
    let mut child = aptward_bin(home.path())
        .arg("classify")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"E: Unable to lock the download directory\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("LockDownloadDir"));
}

#[test]
fn cli_classify_unknown_text_fails() {
    let home = tempfile::tempdir().unwrap();
    let log = home.path().join("apt.log");
    std::fs::write(&log, "nothing to see here\n").unwrap();
    let output = aptward_bin(home.path())
        .args(["classify", &log.to_string_lossy()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(EXIT_FAILURE));
    assert!(String::from_utf8_lossy(&output.stdout).contains("no known diagnostic"));
}

#[test]
fn cli_catalog_json_lists_every_signature() {
    let home = tempfile::tempdir().unwrap();
    let output = aptward_bin(home.path())
        .args(["--json", "catalog"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed = parse_json(&output.stdout);
    let arr = parsed.as_array().unwrap();
    assert_eq!(arr.len(), aptward_catalog::BUILTIN_SIGNATURES.len());
    assert_eq!(arr[0]["code"], "BrokenPackages");
    assert_eq!(arr[0]["number"], 1);
}

#[test]
fn cli_lock_status_reports_held_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_sh_config(dir.path());

    let free = aptward_bin(dir.path())
        .args(["--config", &config.to_string_lossy(), "--json", "lock-status"])
        .output()
        .unwrap();
    assert!(free.status.success());
    let parsed = parse_json(&free.stdout);
    assert_eq!(parsed["locked"], false);
    assert_eq!(parsed["files"][0]["state"], "missing");

    let holder = std::fs::File::create(dir.path().join("lock")).unwrap();
    holder.lock_exclusive().unwrap();
    let held = aptward_bin(dir.path())
        .args(["--config", &config.to_string_lossy(), "--json", "lock-status"])
        .output()
        .unwrap();
    assert_eq!(held.status.code(), Some(EXIT_LOCKED));
    let parsed = parse_json(&held.stdout);
    assert_eq!(parsed["locked"], true);
    assert_eq!(parsed["files"][0]["state"], "flock");
}

#[test]
fn cli_exec_success() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_sh_config(dir.path());
    let output = aptward_bin(dir.path())
        .args(["--config", &config.to_string_lossy(), "--json", "exec", "--", "-c", "echo hello"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "exec must exit 0. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let parsed = parse_json(&output.stdout);
    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["records"], 1);
}

#[test]
fn cli_exec_classifies_tool_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_sh_config(dir.path());
    let output = aptward_bin(dir.path())
        .args([
            "--config",
            &config.to_string_lossy(),
            "--json",
            "exec",
            "--",
            "-c",
            "echo 'E: Broken packages'; exit 100",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(EXIT_CLASSIFIED));
    let parsed = parse_json(&output.stdout);
    assert_eq!(parsed["status"], "failed");
    assert_eq!(parsed["error"]["code"], "BrokenPackages");
}

#[test]
fn cli_exec_benign_line_does_not_mask_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_sh_config(dir.path());
    let output = aptward_bin(dir.path())
        .args([
            "--config",
            &config.to_string_lossy(),
            "--json",
            "exec",
            "--",
            "-c",
            "echo 'vim is already the newest version.'; echo 'E: Broken packages'; exit 100",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(EXIT_CLASSIFIED));
    let parsed = parse_json(&output.stdout);
    assert_eq!(parsed["status"], "failed");
    assert_eq!(parsed["error"]["code"], "BrokenPackages");
}

#[test]
fn cli_exec_streams_progress_as_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_sh_config(dir.path());
    let output = aptward_bin(dir.path())
        .args([
            "--config",
            &config.to_string_lossy(),
            "--json",
            "exec",
            "--",
            "-c",
            "echo '40% [1 vim 1/10KB 40%]'; echo 'Done.'",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let progress: Vec<serde_json::Value> = stdout
        .lines()
        .filter(|l| l.starts_with("{\"progress\""))
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(progress.len(), 2);
    assert_eq!(
        progress[0]["progress"]["event_name"],
        "system.downloadProgress-vim"
    );
    assert_eq!(progress[1]["progress"]["phase"], "after");
    assert_eq!(progress[1]["progress"]["percent"], 100.0);
}

#[test]
fn cli_exec_refuses_when_locked() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_sh_config(dir.path());
    let holder = std::fs::File::create(dir.path().join("lock")).unwrap();
    holder.lock_exclusive().unwrap();

    let output = aptward_bin(dir.path())
        .args(["--config", &config.to_string_lossy(), "exec", "--", "-c", "echo never"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(EXIT_LOCKED));
    assert!(String::from_utf8_lossy(&output.stderr).contains("locked:"));
}

#[test]
fn cli_invalid_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[tool]\nprogramme = \"sh\"\n").unwrap();
    let output = aptward_bin(dir.path())
        .args(["--config", &config.to_string_lossy(), "lock-status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(EXIT_FAILURE));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid config"));
}

#[test]
fn cli_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    let output = aptward_bin(home.path())
        .args(["completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("aptward"));
}
