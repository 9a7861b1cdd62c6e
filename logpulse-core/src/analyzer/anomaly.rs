use crate::config::DetectionConfig;
use crate::error::{Diagnostic, RuleError};
use crate::model::{LogEntry, LogFormat};
use chrono::{DateTime, DurationRound, TimeDelta, Timelike, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    ErrorSpike,
    IpAnomaly,
    UnusualPattern,
    FrequencyAnomaly,
    TimeAnomaly,
    StatusAnomaly,
}

impl AnomalyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyType::ErrorSpike => "error_spike",
            AnomalyType::IpAnomaly => "ip_anomaly",
            AnomalyType::UnusualPattern => "unusual_pattern",
            AnomalyType::FrequencyAnomaly => "frequency_anomaly",
            AnomalyType::TimeAnomaly => "time_anomaly",
            AnomalyType::StatusAnomaly => "status_anomaly",
        }
    }
}

impl std::fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// One detection result. `timestamp` is when the run detected it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    pub description: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub details: Map<String, Value>,
}

/// What a rule reports before the detector stamps it.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    pub description: String,
    pub details: Map<String, Value>,
}

impl Finding {
    fn new<D: Serialize>(
        anomaly_type: AnomalyType,
        severity: Severity,
        description: String,
        details: &D,
    ) -> Result<Self, RuleError> {
        Ok(Self {
            anomaly_type,
            severity,
            description,
            details: to_details(details)?,
        })
    }

    fn into_anomaly(self, detected_at: DateTime<Utc>) -> Anomaly {
        Anomaly {
            anomaly_type: self.anomaly_type,
            severity: self.severity,
            description: self.description,
            timestamp: Some(detected_at),
            details: self.details,
        }
    }
}

pub type RuleFn = fn(&[LogEntry], &DetectionConfig) -> Result<Option<Finding>, RuleError>;

/// A named detection rule. Rules only read the entries and never see each
/// other's output.
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub detect: RuleFn,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// The built-in rules in reporting order.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule { name: "error_spike", detect: detect_error_spike },
        Rule { name: "ip_anomaly", detect: detect_ip_anomaly },
        Rule { name: "unusual_pattern", detect: detect_unusual_pattern },
        Rule { name: "frequency_anomaly", detect: detect_frequency_anomaly },
        Rule { name: "time_anomaly", detect: detect_time_anomaly },
        Rule { name: "status_anomaly", detect: detect_status_anomaly },
    ]
}

#[derive(Debug, Default)]
pub struct DetectionOutcome {
    pub anomalies: Vec<Anomaly>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct AnomalyDetector {
    config: DetectionConfig,
    rules: Vec<Rule>,
}

impl AnomalyDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self::with_rules(config, default_rules())
    }

    pub fn with_rules(config: DetectionConfig, rules: Vec<Rule>) -> Self {
        Self { config, rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Run every rule over the same entries. A failing rule becomes a
    /// diagnostic; the others still report.
    pub fn detect(&self, entries: &[LogEntry], detected_at: DateTime<Utc>) -> DetectionOutcome {
        let results: Vec<(&'static str, Result<Option<Finding>, RuleError>)> = self
            .rules
            .par_iter()
            .map(|rule| (rule.name, (rule.detect)(entries, &self.config)))
            .collect();

        let mut outcome = DetectionOutcome::default();
        for (name, result) in results {
            match result {
                Ok(Some(finding)) => {
                    debug!("Rule {} fired: {}", name, finding.description);
                    outcome.anomalies.push(finding.into_anomaly(detected_at));
                }
                Ok(None) => debug!("Rule {} found nothing", name),
                Err(e) => {
                    warn!("Rule {} failed: {}", name, e);
                    outcome.diagnostics.push(Diagnostic::from_rule_error(name, &e));
                }
            }
        }
        outcome
    }
}

fn to_details<D: Serialize>(details: &D) -> Result<Map<String, Value>, RuleError> {
    match serde_json::to_value(details)? {
        Value::Object(map) => Ok(map),
        other => Err(RuleError::InvalidDetails(format!("expected an object, got {}", other))),
    }
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 * 10_000.0 / total as f64).round() / 100.0
}

/// Highest count wins, ties go to the smallest key.
fn most_frequent<K: Ord + Copy>(counts: impl IntoIterator<Item = (K, usize)>) -> Option<(K, usize)> {
    counts.into_iter().fold(None, |best, (key, count)| match best {
        Some((best_key, best_count)) if best_count > count || (best_count == count && best_key < key) => {
            Some((best_key, best_count))
        }
        _ => Some((key, count)),
    })
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max).collect::<String>())
    }
}

#[derive(Serialize)]
struct ErrorSpikeDetails {
    error_rate: f64,
    error_count: usize,
    total_entries: usize,
    threshold: f64,
}

pub fn detect_error_spike(entries: &[LogEntry], config: &DetectionConfig) -> Result<Option<Finding>, RuleError> {
    let total_entries = entries.len();
    let error_count = entries.iter().filter(|e| e.level.is_error()).count();
    if total_entries == 0 || error_count == 0 {
        return Ok(None);
    }

    let error_rate = error_count as f64 / total_entries as f64;
    if error_rate <= config.error_rate_threshold {
        return Ok(None);
    }

    let description = format!(
        "High error rate: {:.1}% of entries are errors ({} of {}, threshold {:.1}%)",
        error_rate * 100.0,
        error_count,
        total_entries,
        config.error_rate_threshold * 100.0
    );
    let details = ErrorSpikeDetails {
        error_rate,
        error_count,
        total_entries,
        threshold: config.error_rate_threshold,
    };
    Finding::new(AnomalyType::ErrorSpike, Severity::High, description, &details).map(Some)
}

#[derive(Serialize)]
struct IpDetails<'a> {
    ip_address: &'a str,
    total_requests: usize,
    percentage: f64,
    failed_requests: usize,
    threshold: usize,
}

pub fn detect_ip_anomaly(entries: &[LogEntry], config: &DetectionConfig) -> Result<Option<Finding>, RuleError> {
    let mut per_ip: HashMap<&str, usize> = HashMap::new();
    for ip in entries.iter().filter_map(|e| e.ip_address.as_deref()) {
        *per_ip.entry(ip).or_insert(0) += 1;
    }

    let Some((ip_address, total_requests)) = most_frequent(per_ip) else {
        return Ok(None);
    };
    if total_requests <= config.ip_request_threshold {
        return Ok(None);
    }

    let failed_requests = entries
        .iter()
        .filter(|e| e.ip_address.as_deref() == Some(ip_address))
        .filter(|e| e.status_code.is_some_and(|s| s >= 400))
        .count();
    let percentage = percent(total_requests, entries.len());

    let description = format!(
        "Suspicious IP activity: {} made {} requests ({:.1}% of entries, threshold {})",
        ip_address, total_requests, percentage, config.ip_request_threshold
    );
    let details = IpDetails {
        ip_address,
        total_requests,
        percentage,
        failed_requests,
        threshold: config.ip_request_threshold,
    };
    Finding::new(AnomalyType::IpAnomaly, Severity::Medium, description, &details).map(Some)
}

#[derive(Serialize)]
struct PatternDetails<'a> {
    message: &'a str,
    count: usize,
    percentage: f64,
    threshold: usize,
}

pub fn detect_unusual_pattern(entries: &[LogEntry], config: &DetectionConfig) -> Result<Option<Finding>, RuleError> {
    let mut per_message: HashMap<&str, usize> = HashMap::new();
    for entry in entries {
        *per_message.entry(entry.message.as_str()).or_insert(0) += 1;
    }

    let Some((message, count)) = most_frequent(per_message) else {
        return Ok(None);
    };
    if count <= config.message_repeat_threshold {
        return Ok(None);
    }

    let percentage = percent(count, entries.len());
    let description = format!(
        "Repeated message seen {} times ({:.1}% of entries): \"{}\"",
        count,
        percentage,
        truncate_chars(message, 50)
    );
    let details = PatternDetails {
        message,
        count,
        percentage,
        threshold: config.message_repeat_threshold,
    };
    Finding::new(AnomalyType::UnusualPattern, Severity::Medium, description, &details).map(Some)
}

#[derive(Serialize)]
struct BurstDetails {
    window_start: DateTime<Utc>,
    window_count: usize,
    baseline_average: f64,
    std_dev: f64,
    deviation: f64,
    active_windows: usize,
}

pub fn detect_frequency_anomaly(entries: &[LogEntry], config: &DetectionConfig) -> Result<Option<Finding>, RuleError> {
    let mut per_minute: BTreeMap<DateTime<Utc>, usize> = BTreeMap::new();
    // Timestamps at the edge of the representable range cannot be truncated
    for minute in entries
        .iter()
        .filter_map(|e| e.timestamp)
        .filter_map(|ts| ts.duration_trunc(TimeDelta::minutes(1)).ok())
    {
        *per_minute.entry(minute).or_insert(0) += 1;
    }

    let active_windows = per_minute.len();
    if active_windows < config.burst_min_windows.max(2) {
        return Ok(None);
    }

    let n = active_windows as f64;
    let mean = per_minute.values().sum::<usize>() as f64 / n;
    let variance = per_minute
        .values()
        .map(|&c| (c as f64 - mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);
    let std_dev = variance.sqrt();
    if std_dev <= 0.0 {
        return Ok(None);
    }

    let limit = mean + config.burst_deviation_factor * std_dev;
    let Some((window_start, window_count)) = most_frequent(
        per_minute.into_iter().filter(|(_, count)| *count as f64 > limit),
    ) else {
        return Ok(None);
    };

    let deviation = (window_count as f64 - mean) / std_dev;
    let description = format!(
        "Burst of activity at {}: {} entries in one minute vs average {:.1}",
        window_start.format("%Y-%m-%d %H:%M"),
        window_count,
        mean
    );
    let details = BurstDetails {
        window_start,
        window_count,
        baseline_average: mean,
        std_dev,
        deviation,
        active_windows,
    };
    Finding::new(AnomalyType::FrequencyAnomaly, Severity::Medium, description, &details).map(Some)
}

#[derive(Serialize)]
struct OffHoursDetails {
    window: String,
    hour: u32,
    observed_count: usize,
    expected_range: String,
}

fn within_business_hours(hour: u32, start: u32, end: u32) -> bool {
    if start <= end {
        hour >= start && hour < end
    } else {
        hour >= start || hour < end
    }
}

pub fn detect_time_anomaly(entries: &[LogEntry], config: &DetectionConfig) -> Result<Option<Finding>, RuleError> {
    let (start, end) = (config.business_hours_start, config.business_hours_end);
    if start > 23 || end > 24 {
        return Err(RuleError::Internal(format!("invalid business hours {}-{}", start, end)));
    }

    let mut per_hour: BTreeMap<u32, usize> = BTreeMap::new();
    for entry in entries.iter().filter(|e| e.level.is_error()) {
        if let Some(ts) = entry.timestamp {
            if !within_business_hours(ts.hour(), start, end) {
                *per_hour.entry(ts.hour()).or_insert(0) += 1;
            }
        }
    }

    let Some((hour, observed_count)) = most_frequent(per_hour) else {
        return Ok(None);
    };
    if observed_count < config.off_hours_min_errors.max(1) {
        return Ok(None);
    }

    let window = format!("{:02}:00-{:02}:00", hour, (hour + 1) % 24);
    let expected_range = format!("{:02}:00-{:02}:00", start, end);
    let description = format!(
        "{} errors logged outside business hours in {} (expected activity {})",
        observed_count, window, expected_range
    );
    let details = OffHoursDetails {
        window,
        hour,
        observed_count,
        expected_range,
    };
    Finding::new(AnomalyType::TimeAnomaly, Severity::Low, description, &details).map(Some)
}

#[derive(Serialize)]
struct StatusDetails {
    status_code: u16,
    count: usize,
    percentage: f64,
    total_requests: usize,
}

pub fn detect_status_anomaly(entries: &[LogEntry], config: &DetectionConfig) -> Result<Option<Finding>, RuleError> {
    let mut per_status: BTreeMap<u16, usize> = BTreeMap::new();
    let mut total_requests = 0;
    for entry in entries.iter().filter(|e| e.format == LogFormat::Apache) {
        if let Some(status) = entry.status_code {
            total_requests += 1;
            if status >= 400 {
                *per_status.entry(status).or_insert(0) += 1;
            }
        }
    }
    if total_requests == 0 {
        return Ok(None);
    }

    let qualifying = per_status
        .into_iter()
        .filter(|(_, count)| *count as f64 / total_requests as f64 > config.status_share_threshold);
    let Some((status_code, count)) = most_frequent(qualifying) else {
        return Ok(None);
    };

    let percentage = percent(count, total_requests);
    let description = format!(
        "High rate of HTTP {} responses: {:.1}% of {} requests",
        status_code, percentage, total_requests
    );
    let details = StatusDetails {
        status_code,
        count,
        percentage,
        total_requests,
    };
    Finding::new(AnomalyType::StatusAnomaly, Severity::Medium, description, &details).map(Some)
}
