use super::OutputGenerator;
use crate::report::AnalysisReport;
use anyhow::Result;
use std::fmt::Write as _;

/// Human-readable plain text.
pub struct ConsoleOutput;

impl OutputGenerator for ConsoleOutput {
    fn generate(&self, report: &AnalysisReport) -> Result<String> {
        let mut out = String::new();

        writeln!(out, "=== Log Analysis Report ===")?;
        writeln!(out, "Total entries: {}", report.total_entries)?;
        if report.skipped_lines > 0 {
            writeln!(out, "Skipped lines: {}", report.skipped_lines)?;
        }

        let stats = &report.statistics;
        writeln!(out, "\nLevels:")?;
        writeln!(out, "  errors:   {}", stats.error_count)?;
        writeln!(out, "  warnings: {}", stats.warning_count)?;
        writeln!(out, "  info:     {}", stats.info_count)?;

        match report.max_severity() {
            Some(severity) => writeln!(
                out,
                "\nAnomalies ({}, highest severity {}):",
                report.anomalies.len(),
                severity
            )?,
            None => writeln!(out, "\nAnomalies (0):\n  none detected")?,
        }
        for anomaly in &report.anomalies {
            writeln!(
                out,
                "  [{}] {}: {}",
                anomaly.severity.to_string().to_uppercase(),
                anomaly.anomaly_type,
                anomaly.description
            )?;
        }

        if let Some(timeline) = &report.timeline {
            let active: Vec<_> = timeline.iter().filter(|(_, b)| b.total > 0).collect();
            writeln!(out, "\nTimeline ({} of {} windows active):", active.len(), timeline.len())?;
            if report.timeline_excluded > 0 {
                writeln!(out, "  {} timestamped entries outside the timeline", report.timeline_excluded)?;
            }
            for (start, bucket) in active {
                writeln!(
                    out,
                    "  {}  total {:>6}  errors {:>5}  warnings {:>5}  info {:>6}",
                    start, bucket.total, bucket.errors, bucket.warnings, bucket.info
                )?;
            }
        }

        if !report.diagnostics.is_empty() {
            writeln!(out, "\nRule failures:")?;
            for diagnostic in &report.diagnostics {
                writeln!(out, "  {}: {}", diagnostic.rule, diagnostic.message)?;
            }
        }

        if let Some(summary) = &report.ai_summary {
            writeln!(out, "\nSummary:\n  {}", summary.summary)?;
            for insight in &summary.insights {
                writeln!(out, "  - {}", insight)?;
            }
            if !summary.recommendations.is_empty() {
                writeln!(out, "Recommendations:")?;
                for recommendation in &summary.recommendations {
                    writeln!(out, "  - {}", recommendation)?;
                }
            }
        }

        Ok(out)
    }

    fn file_extension(&self) -> &str {
        "txt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze_text;
    use crate::config::Config;
    use crate::report::AiSummary;

    #[test]
    fn test_console_report() {
        let text = "2024-01-15 10:30:01 [ERROR] Database connection failed\n\
                    2024-01-15 10:45:00 [INFO] Retrying\n";
        let report = analyze_text(text, &Config::default())
            .unwrap()
            .with_ai_summary(Some(AiSummary {
                summary: "Database trouble".to_string(),
                insights: vec!["System errors detected".to_string()],
                recommendations: vec!["Investigate detected anomalies".to_string()],
            }));
        let out = ConsoleOutput.generate(&report).unwrap();

        assert!(out.contains("Total entries: 2"));
        assert!(out.contains("[HIGH] error_spike"));
        assert!(out.contains("highest severity high"));
        assert!(out.contains("2024-01-15 10:00:00"));
        assert!(out.contains("Timeline (1 of 24 windows active)"));
        assert!(out.contains("Database trouble"));
        assert!(!out.contains("Skipped lines"));
    }

    #[test]
    fn test_console_empty_report() {
        let out = ConsoleOutput.generate(&AnalysisReport::empty()).unwrap();
        assert!(out.contains("none detected"));
        assert!(!out.contains("Timeline"));
    }

    #[test]
    fn test_console_mentions_excluded_entries() {
        let mut report = AnalysisReport::empty();
        report.timeline = Some(Default::default());
        report.timeline_excluded = 3;
        let out = ConsoleOutput.generate(&report).unwrap();
        assert!(out.contains("3 timestamped entries outside the timeline"));
    }
}
