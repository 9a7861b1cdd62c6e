use crate::error::AnalysisError;
use crate::parser::ParseOptions;
use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detection: DetectionConfig,
    pub timeline: TimelineConfig,
    pub parsing: ParsingConfig,
    pub summary: SummaryConfig,
}

/// Thresholds for the anomaly rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// error_spike fires above this share of error-level entries
    pub error_rate_threshold: f64,
    /// ip_anomaly fires above this many requests from one address
    pub ip_request_threshold: usize,
    /// unusual_pattern fires above this many identical messages
    pub message_repeat_threshold: usize,
    /// frequency_anomaly needs at least this many active minutes
    pub burst_min_windows: usize,
    /// standard deviations above the mean for a burst
    pub burst_deviation_factor: f64,
    pub business_hours_start: u32,
    pub business_hours_end: u32,
    pub off_hours_min_errors: usize,
    /// status_anomaly fires above this share of access-log requests
    pub status_share_threshold: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            error_rate_threshold: 0.10,
            ip_request_threshold: 100,
            message_repeat_threshold: 10,
            burst_min_windows: 3,
            burst_deviation_factor: 2.0,
            business_hours_start: 9,
            business_hours_end: 18,
            off_hours_min_errors: 1,
            status_share_threshold: 0.10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimelineAnchor {
    /// Last bucket holds the latest entry timestamp
    LatestEntry,
    /// Last bucket holds the current wall-clock time
    Now,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimelineRange {
    /// Exactly `window_count` windows ending at the anchor
    Fixed,
    /// At least `window_count` windows, extended back to the earliest entry
    CoverEntries,
}

/// Upper bound on windows in one timeline, whatever the range policy.
pub const MAX_TIMELINE_WINDOWS: usize = 10_000;
/// Longest accepted window: 30 days.
pub const MAX_WINDOW_MINUTES: u32 = 30 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub enabled: bool,
    pub window_minutes: u32,
    pub window_count: usize,
    pub anchor: TimelineAnchor,
    pub range: TimelineRange,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_minutes: 60,
            window_count: 24,
            anchor: TimelineAnchor::LatestEntry,
            range: TimelineRange::CoverEntries,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    pub max_entries: Option<usize>,
    pub syslog_year: Option<i32>,
}

impl ParsingConfig {
    pub fn to_options(&self) -> ParseOptions {
        ParseOptions {
            syslog_year: self.syslog_year.unwrap_or_else(|| Utc::now().year()),
            max_entries: self.max_entries,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// none, basic or openai
    pub provider: String,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub api_key: Option<String>,
    pub sample_size: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            provider: "none".to_string(),
            model: None,
            timeout_secs: Some(30),
            max_tokens: Some(500),
            temperature: Some(0.3),
            api_key: None,
            sample_size: 10,
        }
    }
}

impl Config {
    /// Load from the user config directory, falling back to defaults.
    pub fn load() -> Result<Self> {
        if let Some(config_path) = Self::get_config_path() {
            if config_path.exists() {
                let content = fs::read_to_string(&config_path)?;
                match toml::from_str::<Config>(&content) {
                    Ok(config) => match config.validate() {
                        Ok(()) => {
                            debug!("Loaded configuration from {}", config_path.display());
                            return Ok(config);
                        }
                        Err(e) => warn!("Ignoring invalid config {}: {}", config_path.display(), e),
                    },
                    Err(e) => {
                        warn!("Ignoring unparseable config {}: {}", config_path.display(), e);
                    }
                }
            }
        }
        Ok(Config::default())
    }

    /// Load an explicitly named file; unlike [`Config::load`] a bad file is an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str::<Config>(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Reject values the analysis cannot run with.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let detection = &self.detection;
        let timeline = &self.timeline;

        if !(1..=MAX_WINDOW_MINUTES).contains(&timeline.window_minutes) {
            return Err(AnalysisError::Config(format!(
                "timeline.window_minutes must be between 1 and {}, got {}",
                MAX_WINDOW_MINUTES, timeline.window_minutes
            )));
        }
        if !(1..=MAX_TIMELINE_WINDOWS).contains(&timeline.window_count) {
            return Err(AnalysisError::Config(format!(
                "timeline.window_count must be between 1 and {}, got {}",
                MAX_TIMELINE_WINDOWS, timeline.window_count
            )));
        }
        if detection.business_hours_start > 23 || detection.business_hours_end > 24 {
            return Err(AnalysisError::Config(format!(
                "detection business hours must lie within 0-24, got {}-{}",
                detection.business_hours_start, detection.business_hours_end
            )));
        }
        for (name, share) in [
            ("error_rate_threshold", detection.error_rate_threshold),
            ("status_share_threshold", detection.status_share_threshold),
        ] {
            if !(0.0..=1.0).contains(&share) {
                return Err(AnalysisError::Config(format!(
                    "detection.{} must be a share between 0 and 1, got {}",
                    name, share
                )));
            }
        }
        if !detection.burst_deviation_factor.is_finite() || detection.burst_deviation_factor < 0.0 {
            return Err(AnalysisError::Config(format!(
                "detection.burst_deviation_factor must be a non-negative number, got {}",
                detection.burst_deviation_factor
            )));
        }
        Ok(())
    }

    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("logpulse").join("config.toml"))
    }

    /// Priority: environment variable > config file > None
    pub fn get_api_key(&self, provider: &str) -> Option<String> {
        if let Ok(key) = env::var(format!("{}_API_KEY", provider.to_uppercase())) {
            if !key.is_empty() {
                return Some(key);
            }
        }
        self.summary.api_key.clone()
    }
}
