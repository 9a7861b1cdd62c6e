pub mod access;
pub mod generic;
pub mod syslog;
pub mod timestamp;

use crate::analyzer::CancellationFlag;
use crate::error::AnalysisError;
use crate::input::ensure_text;
use crate::model::{LogEntry, LogFormat};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use generic::{sniff_level, strip_ansi_codes};

/// Lines between two cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Year given to syslog timestamps, which carry none.
    pub syslog_year: i32,
    /// Stop after this many entries.
    pub max_entries: Option<usize>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            syslog_year: Utc::now().year(),
            max_entries: None,
        }
    }
}

impl LogFormat {
    /// Classify one raw line. Access logs win over syslog, everything
    /// unrecognized is generic.
    pub fn detect(line: &str) -> LogFormat {
        if access::is_access_line(line) {
            LogFormat::Apache
        } else if syslog::is_syslog_line(line) {
            LogFormat::Syslog
        } else {
            LogFormat::Generic
        }
    }
}

/// Parse one line, `None` when it has to be skipped.
pub fn parse_line(line_number: usize, raw: &str, options: &ParseOptions) -> Option<LogEntry> {
    if raw.trim().is_empty() {
        return None;
    }

    match LogFormat::detect(raw) {
        LogFormat::Apache => access::parse_access_line(line_number, raw, options),
        LogFormat::Syslog => syslog::parse_syslog_line(line_number, raw, options),
        LogFormat::Generic => Some(generic::parse_generic_line(line_number, raw, options)),
    }
}

/// Output of one parsing run.
#[derive(Debug, Clone, Default)]
pub struct ParsedLog {
    pub entries: Vec<LogEntry>,
    pub parsed_count: usize,
    pub skipped_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LogParser {
    options: ParseOptions,
    cancel: Option<CancellationFlag>,
}

impl LogParser {
    pub fn new(options: ParseOptions) -> Self {
        Self { options, cancel: None }
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Parse the full text of one log file.
    ///
    /// Entries keep file order and their 1-based physical line numbers. Only
    /// binary input and cancellation fail the run.
    pub fn parse(&self, text: &str) -> Result<ParsedLog, AnalysisError> {
        ensure_text(text)?;

        let mut parsed = ParsedLog::default();

        for (index, line) in text.lines().enumerate() {
            if index % CANCEL_CHECK_INTERVAL == 0 {
                self.check_cancelled()?;
            }

            if let Some(max) = self.options.max_entries {
                if parsed.entries.len() >= max {
                    debug!("Reached max_entries={}, ignoring remaining lines", max);
                    break;
                }
            }

            match parse_line(index + 1, line, &self.options) {
                Some(entry) => parsed.entries.push(entry),
                None => parsed.skipped_count += 1,
            }
        }

        parsed.parsed_count = parsed.entries.len();
        info!(
            "Parsed {} entries, skipped {} lines",
            parsed.parsed_count, parsed.skipped_count
        );

        Ok(parsed)
    }

    fn check_cancelled(&self) -> Result<(), AnalysisError> {
        match &self.cancel {
            Some(flag) if flag.is_cancelled() => {
                info!("Parsing cancelled");
                Err(AnalysisError::Cancelled)
            }
            _ => Ok(()),
        }
    }
}

/// Parse with default options.
pub fn parse_log_text(text: &str) -> Result<ParsedLog, AnalysisError> {
    LogParser::default().parse(text)
}
