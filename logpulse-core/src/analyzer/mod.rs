pub mod anomaly;
pub mod statistics;
pub mod timeline;

use crate::config::Config;
use crate::error::AnalysisError;
use crate::parser::{LogParser, ParsedLog};
use crate::report::AnalysisReport;
use anomaly::{AnomalyDetector, Rule};
use chrono::{DateTime, Utc};
use statistics::Statistics;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use timeline::{build_timeline, TimelineOutcome};
use tracing::{debug, info};

/// Cooperative cancellation shared between a run and whoever started it.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs parsing and the three independent consumers of the parsed entries.
pub struct Analyzer {
    config: Config,
    detector: AnomalyDetector,
    cancel: CancellationFlag,
}

impl Analyzer {
    pub fn new(config: Config) -> Self {
        let detector = AnomalyDetector::new(config.detection.clone());
        Self {
            config,
            detector,
            cancel: CancellationFlag::new(),
        }
    }

    /// Replace the built-in rule set.
    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.detector = AnomalyDetector::with_rules(self.config.detection.clone(), rules);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    pub fn parse(&self, text: &str) -> Result<ParsedLog, AnalysisError> {
        LogParser::new(self.config.parsing.to_options())
            .with_cancellation(self.cancel.clone())
            .parse(text)
    }

    pub fn analyze(&self, text: &str) -> Result<AnalysisReport, AnalysisError> {
        let parsed = self.parse(text)?;
        self.analyze_parsed(&parsed)
    }

    pub fn analyze_parsed(&self, parsed: &ParsedLog) -> Result<AnalysisReport, AnalysisError> {
        self.analyze_parsed_at(parsed, Utc::now())
    }

    /// Same as [`Analyzer::analyze_parsed`] with a fixed detection time, which
    /// also serves as the "now" timeline anchor.
    pub fn analyze_parsed_at(
        &self,
        parsed: &ParsedLog,
        now: DateTime<Utc>,
    ) -> Result<AnalysisReport, AnalysisError> {
        self.check_cancelled()?;

        let entries = parsed.entries.as_slice();
        let timeline_config = &self.config.timeline;
        let build = || {
            timeline_config
                .enabled
                .then(|| build_timeline(entries, timeline_config, now))
        };

        if entries.is_empty() {
            let timeline = build();
            return Ok(AnalysisReport {
                total_entries: parsed.parsed_count,
                timeline: timeline.map(|t| t.timeline),
                skipped_lines: parsed.skipped_count,
                ..AnalysisReport::empty()
            });
        }

        debug!("Running {} detection rules", self.detector.rules().len());
        let (outcome, (statistics, timeline)) = rayon::join(
            || self.detector.detect(entries, now),
            || rayon::join(|| Statistics::from_entries(entries), build),
        );

        self.check_cancelled()?;

        info!(
            "Analysis complete: {} entries, {} anomalies, {} rule failures",
            parsed.parsed_count,
            outcome.anomalies.len(),
            outcome.diagnostics.len()
        );

        let TimelineOutcome {
            timeline,
            excluded: timeline_excluded,
        } = timeline.unwrap_or_default();
        Ok(AnalysisReport {
            total_entries: parsed.parsed_count,
            anomalies: outcome.anomalies,
            statistics,
            timeline: timeline_config.enabled.then_some(timeline),
            timeline_excluded,
            ai_summary: None,
            skipped_lines: parsed.skipped_count,
            diagnostics: outcome.diagnostics,
        })
    }

    fn check_cancelled(&self) -> Result<(), AnalysisError> {
        if self.cancel.is_cancelled() {
            info!("Analysis cancelled");
            return Err(AnalysisError::Cancelled);
        }
        Ok(())
    }
}

/// Parse and analyze one decoded log text.
pub fn analyze_text(text: &str, config: &Config) -> Result<AnalysisReport, AnalysisError> {
    Analyzer::new(config.clone()).analyze(text)
}
