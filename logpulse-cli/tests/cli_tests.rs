// CLI tests: drive the built binary end to end

use std::io::Write;
use std::process::{Command, Stdio};

const SAMPLE: &str = "2024-01-15 10:30:00 [INFO] Application started\n\
                      2024-01-15 10:30:01 [ERROR] Database connection failed\n\
                      2024-01-15 10:30:02 [WARNING] High memory usage detected\n";

fn logpulse() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_logpulse"));
    cmd.env_remove("LOGPULSE_API_KEY").env_remove("OPENAI_API_KEY");
    cmd
}

fn write_log(content: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content).unwrap();
    file
}

#[test]
fn test_json_report_for_file() {
    let log = write_log(SAMPLE.as_bytes());
    let output = logpulse().arg("--file").arg(log.path()).output().unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["total_entries"], 3);
    assert_eq!(report["statistics"]["error_count"], 1);
    assert_eq!(report["anomalies"][0]["type"], "error_spike");
    assert!(report["timeline"].is_object());
    assert!(report["ai_summary"].is_null());
}

#[test]
fn test_stdin_and_no_timeline() {
    let mut child = logpulse()
        .arg("--no-timeline")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(SAMPLE.as_bytes()).unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["total_entries"], 3);
    assert!(report["timeline"].is_null());
}

#[test]
fn test_console_output_with_basic_summary() {
    let log = write_log(SAMPLE.as_bytes());
    let output = logpulse()
        .args(["--output", "console", "--summary", "basic", "--file"])
        .arg(log.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Total entries: 3"));
    assert!(stdout.contains("Analysis complete. Found 3 log entries"));
}

#[test]
fn test_openai_without_key_falls_back_to_basic() {
    let log = write_log(SAMPLE.as_bytes());
    let output = logpulse()
        .args(["--summary", "openai", "--file"])
        .arg(log.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["ai_summary"]["recommendations"].as_array().unwrap().len(), 3);
}

#[test]
fn test_binary_input_fails() {
    let log = write_log(&[0x7f, b'E', b'L', b'F', 2, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    let output = logpulse().arg("--file").arg(log.path()).output().unwrap();

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not look like text"));
}

#[test]
fn test_save_and_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "[detection]\nerror_rate_threshold = 0.5\n").unwrap();
    let save_path = dir.path().join("out").join("report.json");
    let log = write_log(SAMPLE.as_bytes());

    let output = logpulse()
        .arg("--config")
        .arg(&config_path)
        .arg("--save")
        .arg(&save_path)
        .arg("--file")
        .arg(log.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&save_path).unwrap()).unwrap();
    assert_eq!(saved["anomalies"].as_array().unwrap().len(), 0);
}

#[test]
fn test_bad_config_path_fails() {
    let log = write_log(SAMPLE.as_bytes());
    let output = logpulse()
        .args(["--config", "/no/such/config.toml", "--file"])
        .arg(log.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_rust_log_raises_verbosity() {
    let log = write_log(SAMPLE.as_bytes());
    let output = logpulse()
        .env("RUST_LOG", "logpulse_core=info")
        .arg("--file")
        .arg(log.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Analysis complete:"));

    let output = logpulse()
        .env_remove("RUST_LOG")
        .arg("--file")
        .arg(log.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(!String::from_utf8_lossy(&output.stderr).contains("Analysis complete:"));
}

#[test]
fn test_out_of_range_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "[timeline]\nwindow_minutes = 100000000\nwindow_count = 2000\n").unwrap();
    let log = write_log(SAMPLE.as_bytes());

    let output = logpulse()
        .arg("--config")
        .arg(&config_path)
        .arg("--file")
        .arg(log.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("window_minutes"));
}
