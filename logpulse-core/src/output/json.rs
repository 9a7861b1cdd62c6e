use super::OutputGenerator;
use crate::report::AnalysisReport;
use anyhow::Result;

pub struct JsonOutput {
    pretty: bool,
}

impl JsonOutput {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl OutputGenerator for JsonOutput {
    fn generate(&self, report: &AnalysisReport) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };
        Ok(json)
    }

    fn file_extension(&self) -> &str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze_text;
    use crate::config::Config;

    #[test]
    fn test_json_round_trips_report() {
        let text = "2024-01-15 10:30:01 [ERROR] Database connection failed\n\nnot parsed? still generic\n";
        let report = analyze_text(text, &Config::default()).unwrap();
        let json = JsonOutput::compact().generate(&report).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["total_entries"], 2);
        assert_eq!(value["skipped_lines"], 1);
        assert_eq!(value["anomalies"][0]["type"], "error_spike");
        assert!(value["timeline"].is_object());

        let back: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
