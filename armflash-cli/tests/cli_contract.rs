//! Integration tests for core CLI contract behavior.

use {predicates::prelude::*, std::fs, tempfile::tempdir};

fn cli_cmd() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("armflash")
}

/// A tiny valid HEX32 file: three data bytes at 0x0030 plus EOF.
const TINY_HEX: &str = ":0300300002337A1E\n:00000001FF\n";

#[test]
fn help_exits_zero_and_writes_stdout_only() {
    let mut cmd = cli_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("armflash"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn version_exits_zero_and_writes_stdout_only() {
    let mut cmd = cli_cmd();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("armflash"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn unknown_command_is_a_usage_error() {
    let mut cmd = cli_cmd();
    cmd.arg("unknown-command-xyz")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn flash_without_jobs_is_a_usage_error() {
    let mut cmd = cli_cmd();
    cmd.arg("flash")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn flash_with_incomplete_job_group_fails() {
    let mut cmd = cli_cmd();
    cmd.args(["flash", "/dev/ttyS0", "a.hex", "38400"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("5 tokens"));
}

#[test]
fn flash_with_unknown_device_reports_the_failed_job() {
    let dir = tempdir().expect("tempdir should be created");
    let firmware = dir
        .path()
        .join("firmware.hex");
    fs::write(&firmware, TINY_HEX).expect("write firmware.hex");

    let mut cmd = cli_cmd();
    cmd.arg("flash")
        .arg("/dev/null")
        .arg(firmware.as_os_str())
        .args(["38400", "14746000", "LPC9999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported device"));
}

#[test]
fn dump_of_missing_file_fails() {
    let dir = tempdir().expect("tempdir should be created");
    let nonexistent = dir
        .path()
        .join("not_exists.hex");

    let mut cmd = cli_cmd();
    cmd.arg("dump")
        .arg(nonexistent.as_os_str())
        .assert()
        .failure()
        .stdout(predicate::str::is_empty());
}

#[test]
fn dump_rejects_non_hex_extension() {
    let dir = tempdir().expect("tempdir should be created");
    let binary = dir
        .path()
        .join("firmware.bin");
    fs::write(&binary, b"\x00\x01").expect("write firmware.bin");

    let mut cmd = cli_cmd();
    cmd.arg("dump")
        .arg(binary.as_os_str())
        .assert()
        .failure()
        .stderr(predicate::str::contains(".hex"));
}

#[test]
fn dump_prints_records_of_valid_firmware() {
    let dir = tempdir().expect("tempdir should be created");
    let firmware = dir
        .path()
        .join("firmware.hex");
    fs::write(&firmware, TINY_HEX).expect("write firmware.hex");

    let mut cmd = cli_cmd();
    cmd.arg("dump")
        .arg(firmware.as_os_str())
        .assert()
        .success()
        .stdout(predicate::str::contains("Adr: 0x00000030 Data: 02 33 7a"));
}

#[test]
fn dump_of_corrupted_firmware_fails_checksum() {
    // Last data byte mutated so the record checksum no longer holds.
    let dir = tempdir().expect("tempdir should be created");
    let firmware = dir
        .path()
        .join("firmware.hex");
    fs::write(&firmware, ":0300300002337B1E\n:00000001FF\n").expect("write firmware.hex");

    let mut cmd = cli_cmd();
    cmd.arg("dump")
        .arg(firmware.as_os_str())
        .assert()
        .failure()
        .stderr(predicate::str::contains("CRC test failed"));
}

#[test]
fn list_ports_json_returns_valid_json() {
    let mut cmd = cli_cmd();
    let output = cmd
        .args(["list-ports", "--json"])
        .output()
        .expect("command should execute");

    if output
        .status
        .success()
    {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let parsed: serde_json::Value =
            serde_json::from_str(&stdout).expect("stdout should be valid JSON");
        assert_eq!(parsed["ok"], serde_json::json!(true));
        assert!(parsed["data"]["ports"].is_array());
    }
    // Port enumeration may legitimately fail without device nodes; the
    // command must not crash either way.
}
