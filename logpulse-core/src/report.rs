use crate::analyzer::anomaly::{Anomaly, AnomalyType, Severity};
use crate::analyzer::statistics::Statistics;
use crate::analyzer::timeline::Timeline;
use crate::error::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Externally generated prose summary. Merged into the report as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiSummary {
    pub summary: String,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub total_entries: usize,
    /// Detection order, not severity order.
    pub anomalies: Vec<Anomaly>,
    pub statistics: Statistics,
    pub timeline: Option<Timeline>,
    /// Timestamped entries that fell outside every timeline window
    #[serde(default, skip_serializing_if = "is_zero")]
    pub timeline_excluded: usize,
    pub ai_summary: Option<AiSummary>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub skipped_lines: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl AnalysisReport {
    /// The report for input with no entries.
    pub fn empty() -> Self {
        Self {
            total_entries: 0,
            anomalies: Vec::new(),
            statistics: Statistics::default(),
            timeline: None,
            timeline_excluded: 0,
            ai_summary: None,
            skipped_lines: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_ai_summary(mut self, summary: Option<AiSummary>) -> Self {
        self.ai_summary = summary;
        self
    }

    pub fn anomalies_by_type(&self) -> BTreeMap<String, Vec<&Anomaly>> {
        let mut grouped: BTreeMap<String, Vec<&Anomaly>> = BTreeMap::new();
        for anomaly in &self.anomalies {
            grouped
                .entry(anomaly.anomaly_type.to_string())
                .or_default()
                .push(anomaly);
        }
        grouped
    }

    pub fn severity_counts(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for anomaly in &self.anomalies {
            *counts.entry(anomaly.severity).or_insert(0) += 1;
        }
        counts
    }

    pub fn has_anomaly(&self, anomaly_type: AnomalyType) -> bool {
        self.anomalies.iter().any(|a| a.anomaly_type == anomaly_type)
    }

    /// Highest severity present, if any anomaly fired.
    pub fn max_severity(&self) -> Option<Severity> {
        self.anomalies.iter().map(|a| a.severity).max()
    }
}
