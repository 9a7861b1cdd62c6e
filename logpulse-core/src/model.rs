use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
    Fatal,
}

impl LogLevel {
    /// Counted as an error by statistics, the timeline and the error rules.
    pub fn is_error(self) -> bool {
        matches!(self, LogLevel::Error | LogLevel::Critical | LogLevel::Fatal)
    }

    pub fn is_warning(self) -> bool {
        self == LogLevel::Warning
    }

    /// Resolve a level keyword or one of its aliases.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_uppercase().as_str() {
            "TRACE" | "TRC" | "DEBUG" | "DBG" => Some(LogLevel::Debug),
            "INFO" | "INFORMATION" | "NOTICE" => Some(LogLevel::Info),
            "WARN" | "WARNING" => Some(LogLevel::Warning),
            "ERROR" | "ERR" => Some(LogLevel::Error),
            "CRITICAL" | "CRIT" => Some(LogLevel::Critical),
            "FATAL" | "EMERG" | "EMERGENCY" | "ALERT" | "PANIC" => Some(LogLevel::Fatal),
            _ => None,
        }
    }

    /// Level implied by an HTTP status code.
    pub fn from_status(status: u16) -> Self {
        match status {
            500.. => LogLevel::Error,
            400..=499 => LogLevel::Warning,
            _ => LogLevel::Info,
        }
    }

    /// Level implied by the severity part of a syslog `<PRI>` value.
    pub fn from_syslog_severity(severity: u8) -> Self {
        match severity {
            0 | 1 => LogLevel::Fatal,
            2 => LogLevel::Critical,
            3 => LogLevel::Error,
            4 => LogLevel::Warning,
            5 | 6 => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARNING"),
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Critical => write!(f, "CRITICAL"),
            LogLevel::Fatal => write!(f, "FATAL"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        LogLevel::from_keyword(s).ok_or_else(|| anyhow::anyhow!("Invalid log level: {}", s))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Apache/Nginx style access log
    Apache,
    /// BSD syslog, sshd and delimited-severity application logs
    Syslog,
    /// Anything else
    Generic,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Apache => write!(f, "apache"),
            LogFormat::Syslog => write!(f, "syslog"),
            LogFormat::Generic => write!(f, "generic"),
        }
    }
}

/// One parsed line.
///
/// The format decides which optional fields can be set: access-log entries
/// carry the HTTP fields, syslog entries carry `hostname`/`service`, generic
/// entries carry neither. The constructors below are the only places that
/// populate them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub line_number: usize,
    pub timestamp: Option<DateTime<Utc>>,
    pub level: LogLevel,
    pub message: String,
    pub format: LogFormat,
    pub raw_line: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_size: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

/// Fields extracted from an access-log request.
#[derive(Debug, Clone, Default)]
pub struct AccessFields {
    pub ip_address: String,
    pub http_method: Option<String>,
    pub url: Option<String>,
    pub status_code: u16,
    pub response_size: Option<u64>,
}

impl LogEntry {
    fn base(
        line_number: usize,
        raw_line: &str,
        format: LogFormat,
        timestamp: Option<DateTime<Utc>>,
        level: LogLevel,
        message: String,
    ) -> Self {
        Self {
            line_number,
            timestamp,
            level,
            message,
            format,
            raw_line: raw_line.to_string(),
            ip_address: None,
            http_method: None,
            url: None,
            status_code: None,
            response_size: None,
            hostname: None,
            service: None,
        }
    }

    pub fn access(
        line_number: usize,
        raw_line: &str,
        timestamp: Option<DateTime<Utc>>,
        request_line: String,
        fields: AccessFields,
    ) -> Self {
        let level = LogLevel::from_status(fields.status_code);
        let mut entry = Self::base(line_number, raw_line, LogFormat::Apache, timestamp, level, request_line);
        entry.ip_address = Some(fields.ip_address);
        entry.http_method = fields.http_method;
        entry.url = fields.url;
        entry.status_code = Some(fields.status_code);
        entry.response_size = fields.response_size;
        entry
    }

    pub fn syslog(
        line_number: usize,
        raw_line: &str,
        timestamp: Option<DateTime<Utc>>,
        level: LogLevel,
        message: String,
        hostname: Option<String>,
        service: Option<String>,
    ) -> Self {
        let mut entry = Self::base(line_number, raw_line, LogFormat::Syslog, timestamp, level, message);
        entry.hostname = hostname;
        entry.service = service;
        entry
    }

    pub fn generic(
        line_number: usize,
        raw_line: &str,
        timestamp: Option<DateTime<Utc>>,
        level: LogLevel,
    ) -> Self {
        Self::base(line_number, raw_line, LogFormat::Generic, timestamp, level, raw_line.to_string())
    }

    /// Generic entry whose fields came from a JSON object line.
    pub fn structured(
        line_number: usize,
        raw_line: &str,
        timestamp: Option<DateTime<Utc>>,
        level: LogLevel,
        message: String,
        service: Option<String>,
    ) -> Self {
        let mut entry = Self::base(line_number, raw_line, LogFormat::Generic, timestamp, level, message);
        entry.service = service;
        entry
    }
}
