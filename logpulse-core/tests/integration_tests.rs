// End-to-end pipeline tests: text or file in, report out

use logpulse_core::*;
use std::io::Write;

fn access_line(ip: &str, minute: usize, second: usize, path: &str, status: u16) -> String {
    format!(
        r#"{} - - [15/Jan/2024:10:{:02}:{:02} +0000] "GET {} HTTP/1.1" {} 512"#,
        ip, minute, second, path, status
    )
}

fn scenario_log() -> String {
    (0..1000)
        .map(|i| {
            let ip = if i < 120 {
                "203.0.113.5".to_string()
            } else {
                format!("10.0.{}.{}", i / 250, i % 250)
            };
            let status = if i >= 850 { 500 } else { 200 };
            access_line(&ip, i / 60, i % 60, &format!("/page/{}", i), status)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn test_error_spike_and_ip_scenario() {
    let report = analyze_text(&scenario_log(), &Config::default()).unwrap();

    assert_eq!(report.total_entries, 1000);
    assert_eq!(report.statistics.error_count, 150);

    let spike = report
        .anomalies
        .iter()
        .find(|a| a.anomaly_type == AnomalyType::ErrorSpike)
        .expect("error_spike missing");
    assert_eq!(spike.severity, Severity::High);
    assert!(spike.description.contains("15.0%"));
    assert_eq!(spike.details["error_count"], 150);

    let ip = report
        .anomalies
        .iter()
        .find(|a| a.anomaly_type == AnomalyType::IpAnomaly)
        .expect("ip_anomaly missing");
    assert_eq!(ip.details["ip_address"], "203.0.113.5");
    assert_eq!(ip.details["total_requests"], 120);

    let status = report
        .anomalies
        .iter()
        .find(|a| a.anomaly_type == AnomalyType::StatusAnomaly)
        .expect("status_anomaly missing");
    assert_eq!(status.details["status_code"], 500);

    // table order
    let order: Vec<_> = report.anomalies.iter().map(|a| a.anomaly_type).collect();
    let mut sorted = order.clone();
    sorted.sort_by_key(|t| default_rules().iter().position(|r| r.name == t.as_str()));
    assert_eq!(order, sorted);
}

#[test]
fn test_exactly_ten_percent_errors_is_quiet() {
    let text = (0..100)
        .map(|i| {
            let status = if i < 10 { 503 } else { 200 };
            access_line(&format!("10.1.0.{}", i), 0, i % 60, &format!("/x/{}", i), status)
        })
        .collect::<Vec<_>>()
        .join("\n");
    let report = analyze_text(&text, &Config::default()).unwrap();

    assert_eq!(report.statistics.error_count, 10);
    assert!(!report.has_anomaly(AnomalyType::ErrorSpike));
}

#[test]
fn test_mixed_formats_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"192.168.1.100 - - [15/Jan/2024:10:30:00 +0000] "GET /api/users HTTP/1.1" 503 1234"#).unwrap();
    writeln!(file, "Jan 15 10:31:00 server01 sshd[1234]: Failed password for admin from 192.168.1.100").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "worker crashed with ERROR code 7").unwrap();
    writeln!(file, "2024-01-15 10:33:00 [WARN] Disk almost full").unwrap();

    let text = read_log_file(file.path()).unwrap();
    let analyzer = Analyzer::new(Config::default());
    let parsed = analyzer.parse(&text).unwrap();

    let formats: Vec<_> = parsed.entries.iter().map(|e| e.format).collect();
    assert_eq!(
        formats,
        vec![LogFormat::Apache, LogFormat::Syslog, LogFormat::Generic, LogFormat::Syslog]
    );
    assert_eq!(parsed.entries[0].level, LogLevel::Error);
    assert_eq!(parsed.entries[2].level, LogLevel::Error);
    assert_eq!(parsed.entries[2].line_number, 4);
    assert_eq!(parsed.entries[3].level, LogLevel::Warning);

    let report = analyzer.analyze_parsed(&parsed).unwrap();
    assert_eq!(report.total_entries, 4);
    assert_eq!(report.skipped_lines, 1);

    // the generic line carries no timestamp
    let timeline = report.timeline.unwrap();
    assert_eq!(timeline.values().map(|b| b.total).sum::<usize>(), 3);
}

#[test]
fn test_binary_file_is_a_single_failure() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&[0x7f, b'E', b'L', b'F', 0, 0, 0, 1, 2, 3, 0, 0]).unwrap();

    let err = read_log_file(file.path()).unwrap_err();
    assert!(matches!(err, AnalysisError::BinaryInput { .. }));
}

#[test]
fn test_missing_file() {
    assert!(matches!(
        read_log_file("/definitely/not/here.log"),
        Err(AnalysisError::Io(_))
    ));
}

#[test]
fn test_repeated_runs_are_identical() {
    let analyzer = Analyzer::new(Config::default());
    let text = scenario_log();
    let parsed = analyzer.parse(&text).unwrap();
    let now = chrono::Utc::now();

    let first = analyzer.analyze_parsed_at(&parsed, now).unwrap();
    let second = analyzer.analyze_parsed_at(&parsed, now).unwrap();

    assert_eq!(
        serde_json::to_string(&first.anomalies).unwrap(),
        serde_json::to_string(&second.anomalies).unwrap()
    );
    assert_eq!(first.statistics, second.statistics);
    assert_eq!(first.timeline, second.timeline);
}

#[test]
fn test_configured_thresholds() {
    let mut config = Config::default();
    config.detection.ip_request_threshold = 1000;
    config.detection.error_rate_threshold = 0.5;

    let report = analyze_text(&scenario_log(), &config).unwrap();
    assert!(!report.has_anomaly(AnomalyType::IpAnomaly));
    assert!(!report.has_anomaly(AnomalyType::ErrorSpike));
}

#[tokio::test]
async fn test_summary_merge() {
    let text = scenario_log();
    let analyzer = Analyzer::new(Config::default());
    let parsed = analyzer.parse(&text).unwrap();
    let report = analyzer.analyze_parsed(&parsed).unwrap();

    let context = SummaryContext::build(&report, &parsed.entries, 10);
    assert_eq!(context.sample_messages.len(), 10);
    assert!(context.top_anomalies.len() <= 5);

    let provider = create_provider("basic", None).unwrap();
    let summary = provider.summarize(&context).await.unwrap();
    let report = report.with_ai_summary(summary.clone());
    assert_eq!(report.ai_summary, summary);

    let json = generate_report(&report, OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["ai_summary"]["recommendations"].as_array().unwrap().len(), 3);
}

#[test]
fn test_json_lines_log() {
    let text = (0..20)
        .map(|i| {
            let level = if i % 4 == 0 { "error" } else { "info" };
            format!(
                r#"{{"timestamp":"2024-01-15T10:{:02}:00Z","level":"{}","msg":"request {}","service":"api"}}"#,
                i, level, i
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let report = analyze_text(&text, &Config::default()).unwrap();

    assert_eq!(report.total_entries, 20);
    assert_eq!(report.statistics.error_count, 5);
    assert!(report.has_anomaly(AnomalyType::ErrorSpike));
    let timeline = report.timeline.unwrap();
    assert_eq!(timeline["2024-01-15 10:00:00"].errors, 5);
}

#[test]
fn test_logfmt_log() {
    let text = "ts=2024-01-15T10:00:00Z level=error msg=\"db down\"\n\
                ts=2024-01-15T10:00:05Z level=info msg=\"retrying\"\n";
    let report = analyze_text(text, &Config::default()).unwrap();

    assert_eq!(report.statistics.error_count, 1);
    assert!(report.has_anomaly(AnomalyType::ErrorSpike));
    assert_eq!(report.timeline.unwrap()["2024-01-15 10:00:00"].total, 2);
}
