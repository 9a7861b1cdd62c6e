//! Seam for externally generated report summaries.
//!
//! The analysis core never calls a provider itself. Callers build a
//! [`SummaryContext`] from a finished report, hand it to a
//! [`SummaryProvider`] and merge the result with
//! [`AnalysisReport::with_ai_summary`].

use crate::analyzer::anomaly::Severity;
use crate::analyzer::statistics::{level_distribution, Statistics};
use crate::config::Config;
use crate::model::LogEntry;
use crate::report::{AiSummary, AnalysisReport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use thiserror::Error;
use tracing::{debug, error, info};

#[cfg(feature = "ai-providers")]
pub mod openai;

#[cfg(feature = "ai-providers")]
pub use openai::OpenAIProvider;

/// Anomalies passed on in full.
const MAX_ANOMALY_BRIEFS: usize = 5;
/// Sample messages are cut to this many characters.
const SAMPLE_MESSAGE_CHARS: usize = 100;

#[derive(Error, Debug)]
pub enum AIError {
    #[cfg(feature = "ai-providers")]
    #[error("API request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Authentication failed")]
    AuthenticationError,
    #[error("Rate limited")]
    RateLimited,
    #[error("Provider not supported: {0}")]
    UnsupportedProvider(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyBrief {
    #[serde(rename = "type")]
    pub anomaly_type: String,
    pub severity: Severity,
    pub description: String,
}

/// Everything a summary service gets to see about one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryContext {
    pub total_entries: usize,
    pub statistics: Statistics,
    pub level_counts: BTreeMap<String, usize>,
    pub anomaly_count: usize,
    pub anomaly_counts: BTreeMap<String, usize>,
    pub severity_counts: BTreeMap<String, usize>,
    pub top_anomalies: Vec<AnomalyBrief>,
    pub sample_messages: Vec<String>,
}

impl SummaryContext {
    pub fn build(report: &AnalysisReport, entries: &[LogEntry], sample_size: usize) -> Self {
        let level_counts = level_distribution(entries)
            .into_iter()
            .map(|(level, count)| (level.to_string(), count))
            .collect();
        let anomaly_counts = report
            .anomalies_by_type()
            .into_iter()
            .map(|(kind, anomalies)| (kind, anomalies.len()))
            .collect();
        let severity_counts = report
            .severity_counts()
            .into_iter()
            .map(|(severity, count)| (severity.to_string(), count))
            .collect();

        let top_anomalies = report
            .anomalies
            .iter()
            .take(MAX_ANOMALY_BRIEFS)
            .map(|a| AnomalyBrief {
                anomaly_type: a.anomaly_type.to_string(),
                severity: a.severity,
                description: a.description.clone(),
            })
            .collect();

        let sample_messages = entries
            .iter()
            .filter(|e| !e.message.is_empty())
            .take(sample_size)
            .map(|e| e.message.chars().take(SAMPLE_MESSAGE_CHARS).collect())
            .collect();

        Self {
            total_entries: report.total_entries,
            statistics: report.statistics,
            level_counts,
            anomaly_count: report.anomalies.len(),
            anomaly_counts,
            severity_counts,
            top_anomalies,
            sample_messages,
        }
    }

    /// Plain-text rendering used as the prompt body.
    pub fn to_prompt(&self) -> String {
        let mut prompt = String::new();
        let _ = writeln!(prompt, "Log Analysis Summary:");
        let _ = writeln!(prompt, "- Total log entries: {}", self.total_entries);
        let _ = writeln!(prompt, "- Log levels: {}", json_map(&self.level_counts));
        let _ = writeln!(prompt, "- Total anomalies detected: {}", self.anomaly_count);
        let _ = writeln!(prompt, "- Anomaly types: {}", json_map(&self.anomaly_counts));

        if !self.top_anomalies.is_empty() {
            let _ = writeln!(prompt, "\nTop anomalies:");
            for (i, anomaly) in self.top_anomalies.iter().enumerate() {
                let _ = writeln!(prompt, "{}. {} (Severity: {})", i + 1, anomaly.description, anomaly.severity);
            }
        }

        if !self.sample_messages.is_empty() {
            let _ = writeln!(prompt, "\nSample log messages:");
            for (i, message) in self.sample_messages.iter().enumerate() {
                let _ = writeln!(prompt, "{}. {}", i + 1, message);
            }
        }

        prompt
    }
}

fn json_map(map: &BTreeMap<String, usize>) -> String {
    serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string())
}

#[async_trait::async_trait]
pub trait SummaryProvider: Send + Sync {
    /// `Ok(None)` means no summary is available for this run.
    async fn summarize(&self, context: &SummaryContext) -> Result<Option<AiSummary>, AIError>;
    fn get_provider_name(&self) -> &str;
}

/// Always absent.
pub struct NoSummaryProvider;

#[async_trait::async_trait]
impl SummaryProvider for NoSummaryProvider {
    async fn summarize(&self, _context: &SummaryContext) -> Result<Option<AiSummary>, AIError> {
        Ok(None)
    }

    fn get_provider_name(&self) -> &str {
        "none"
    }
}

/// Deterministic summary built from the counts alone.
pub struct BasicSummaryProvider;

impl BasicSummaryProvider {
    pub fn summary_for(context: &SummaryContext) -> AiSummary {
        AiSummary {
            summary: format!(
                "Analysis complete. Found {} log entries with {} anomalies.",
                context.total_entries, context.anomaly_count
            ),
            insights: vec![
                format!("Log distribution: {}", json_map(&context.level_counts)),
                format!("Anomaly severity: {}", json_map(&context.severity_counts)),
            ],
            recommendations: vec![
                "Review high-severity anomalies first".to_string(),
                "Monitor error rates over time".to_string(),
                "Check system performance metrics".to_string(),
            ],
        }
    }
}

#[async_trait::async_trait]
impl SummaryProvider for BasicSummaryProvider {
    async fn summarize(&self, context: &SummaryContext) -> Result<Option<AiSummary>, AIError> {
        Ok(Some(Self::summary_for(context)))
    }

    fn get_provider_name(&self) -> &str {
        "basic"
    }
}

/// Keyword-derived insights for free-form summary text.
pub fn extract_insights(summary: &str) -> Vec<String> {
    const RULES: &[(&str, &str)] = &[
        ("error", "System errors detected"),
        ("performance", "Performance issues identified"),
        ("security", "Security concerns raised"),
        ("anomal", "Unusual patterns detected"),
        ("network", "Network activity patterns identified"),
        ("access", "Access patterns analyzed"),
    ];
    keyword_matches(summary, RULES, "No specific insights available")
}

/// Keyword-derived recommendations for free-form summary text.
pub fn extract_recommendations(summary: &str) -> Vec<String> {
    const RULES: &[(&str, &str)] = &[
        ("investigate", "Investigate detected anomalies"),
        ("monitor", "Monitor system performance"),
        ("review", "Review system logs regularly"),
        ("update", "Consider system updates"),
        ("security", "Review security configurations"),
        ("backup", "Verify backup systems"),
    ];
    keyword_matches(summary, RULES, "Continue monitoring system health")
}

fn keyword_matches(text: &str, rules: &[(&str, &str)], fallback: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let found: Vec<String> = rules
        .iter()
        .filter(|(keyword, _)| lower.contains(keyword))
        .map(|(_, label)| label.to_string())
        .collect();
    if found.is_empty() {
        vec![fallback.to_string()]
    } else {
        found
    }
}

pub fn create_provider(provider_name: &str, api_key: Option<&str>) -> Result<Box<dyn SummaryProvider>, AIError> {
    create_provider_with_model(provider_name, api_key, None)
}

pub fn create_provider_with_model(
    provider_name: &str,
    api_key: Option<&str>,
    model: Option<String>,
) -> Result<Box<dyn SummaryProvider>, AIError> {
    info!("Creating summary provider: {} with model: {:?}", provider_name, model);
    match provider_name.to_lowercase().as_str() {
        "none" | "" => Ok(Box::new(NoSummaryProvider)),
        "basic" => Ok(Box::new(BasicSummaryProvider)),
        #[cfg(feature = "ai-providers")]
        "openai" => {
            debug!("Initializing OpenAI provider");
            let api_key = api_key.ok_or(AIError::AuthenticationError)?;
            let mut provider = OpenAIProvider::new(api_key.to_string())?;
            if let Some(model_id) = model {
                provider = provider.with_model(model_id);
            }
            Ok(Box::new(provider))
        }
        _ => {
            let _ = api_key;
            error!("Unsupported summary provider: {}", provider_name);
            Err(AIError::UnsupportedProvider(provider_name.to_string()))
        }
    }
}

/// Build the provider named in the `[summary]` section, with its model,
/// timeout and sampling settings. The API key comes from
/// [`Config::get_api_key`].
pub fn create_provider_from_config(config: &Config) -> Result<Box<dyn SummaryProvider>, AIError> {
    let settings = &config.summary;
    if let Some(provider) = configured_http_provider(config) {
        return provider;
    }
    let api_key = config.get_api_key(&settings.provider);
    create_provider_with_model(&settings.provider, api_key.as_deref(), settings.model.clone())
}

#[cfg(feature = "ai-providers")]
fn configured_http_provider(config: &Config) -> Option<Result<Box<dyn SummaryProvider>, AIError>> {
    let settings = &config.summary;
    if !settings.provider.eq_ignore_ascii_case("openai") {
        return None;
    }
    let build = || -> Result<Box<dyn SummaryProvider>, AIError> {
        let api_key = config
            .get_api_key("openai")
            .ok_or(AIError::AuthenticationError)?;
        let timeout = std::time::Duration::from_secs(settings.timeout_secs.unwrap_or(30));
        let mut provider = OpenAIProvider::with_timeout(api_key, timeout)?
            .with_sampling(settings.max_tokens.unwrap_or(500), settings.temperature.unwrap_or(0.3));
        if let Some(model) = &settings.model {
            provider = provider.with_model(model.clone());
        }
        Ok(Box::new(provider))
    };
    Some(build())
}

#[cfg(not(feature = "ai-providers"))]
fn configured_http_provider(_config: &Config) -> Option<Result<Box<dyn SummaryProvider>, AIError>> {
    None
}
