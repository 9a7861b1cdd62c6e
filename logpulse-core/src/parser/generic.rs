use super::timestamp::parse_timestamp;
use super::ParseOptions;
use crate::model::{LogEntry, LogLevel};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Level keywords, longest alias first so alternation never stops on a prefix.
pub(crate) const LEVEL_KEYWORDS: &str = "FATAL|CRITICAL|CRIT|EMERGENCY|EMERG|ALERT|PANIC|ERROR|ERR|WARNING|WARN|NOTICE|INFORMATION|INFO|DEBUG|DBG|TRACE|TRC";

static ANSI_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;]*m").expect("Failed to compile ANSI regex")
});

static LEADING_TIMESTAMP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[?(\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?(?:Z|[+-]\d{2}:?\d{2})?)\]?")
        .expect("Failed to compile timestamp regex")
});

// logfmt style `ts=2024-01-15T10:30:00Z` anywhere in the line
static KEYED_TIMESTAMP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|\s)(?:ts|time|timestamp|@timestamp)="?(\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?(?:Z|[+-]\d{2}:?\d{2})?)"#)
        .expect("Failed to compile keyed timestamp regex")
});

static NUMERIC_LEVEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\blevel\s*[:=]\s*([0-5])\b").expect("Failed to compile numeric level regex")
});

// `level=error`, `lvl=WARN`, `"level":"info"` in any case
static KEYED_LEVEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r#"(?i)\b(?:level|lvl|loglevel|severity)"?\s*[:=]\s*"?({})\b"#, LEVEL_KEYWORDS))
        .expect("Failed to compile keyed level regex")
});

static SEVERITY_WORD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bseverity\s*[:=]\s*(high|medium|low)\b")
        .expect("Failed to compile severity regex")
});

static COLON_LEVEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^\s*({})\s*:\s", LEVEL_KEYWORDS))
        .expect("Failed to compile colon level regex")
});

static DELIMITED_LEVEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)[\[(<]({})[\])>]", LEVEL_KEYWORDS))
        .expect("Failed to compile delimited level regex")
});

// Case-sensitive on purpose: "ERROR" is a level, "error" in prose is not.
static STANDALONE_LEVEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b({})\b", LEVEL_KEYWORDS))
        .expect("Failed to compile standalone level regex")
});

/// Strip ANSI escape codes from a string
/// Examples: "\x1b[31mERROR\x1b[0;39m" -> "ERROR"
pub fn strip_ansi_codes(text: &str) -> String {
    ANSI_REGEX.replace_all(text, "").to_string()
}

/// Find an explicit level in free text.
///
/// Checked from most to least specific: `level=N`, `level=KEYWORD` in any
/// case, `severity: high`, a leading `KEYWORD:`, a bracketed `[KEYWORD]`, and
/// finally a bare keyword written in upper case.
pub fn sniff_level(line: &str) -> Option<LogLevel> {
    let line = strip_ansi_codes(line);

    if let Some(caps) = NUMERIC_LEVEL_REGEX.captures(&line) {
        return caps[1].parse().ok().and_then(numeric_level);
    }

    if let Some(level) = KEYED_LEVEL_REGEX
        .captures(&line)
        .and_then(|caps| LogLevel::from_keyword(&caps[1]))
    {
        return Some(level);
    }

    if let Some(caps) = SEVERITY_WORD_REGEX.captures(&line) {
        return match caps[1].to_ascii_lowercase().as_str() {
            "high" => Some(LogLevel::Error),
            "medium" => Some(LogLevel::Warning),
            _ => Some(LogLevel::Info),
        };
    }

    [&*COLON_LEVEL_REGEX, &*DELIMITED_LEVEL_REGEX, &*STANDALONE_LEVEL_REGEX]
        .into_iter()
        .find_map(|re| re.captures(&line).and_then(|caps| LogLevel::from_keyword(&caps[1])))
}

/// Numeric levels: `0..=5` (debug to fatal) or the 10-step scale used by
/// JSON loggers such as pino and bunyan (10 trace to 60 fatal).
fn numeric_level(n: u64) -> Option<LogLevel> {
    match n {
        0 | 1 => Some(LogLevel::Debug),
        2 => Some(LogLevel::Info),
        3 => Some(LogLevel::Warning),
        4 => Some(LogLevel::Error),
        5 => Some(LogLevel::Fatal),
        10..=29 => Some(LogLevel::Debug),
        30..=39 => Some(LogLevel::Info),
        40..=49 => Some(LogLevel::Warning),
        50..=59 => Some(LogLevel::Error),
        60.. => Some(LogLevel::Fatal),
        _ => None,
    }
}

fn first_field<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| fields.get(*key).filter(|value| !value.is_null()))
}

fn json_timestamp(value: &Value, syslog_year: i32) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => parse_timestamp(text, syslog_year),
        // Epoch seconds, or milliseconds once the value is too large to be seconds
        Value::Number(number) => {
            let n = number.as_i64()?;
            if n.abs() >= 100_000_000_000 {
                DateTime::from_timestamp_millis(n)
            } else {
                DateTime::from_timestamp(n, 0)
            }
        }
        _ => None,
    }
}

fn json_level(value: &Value) -> Option<LogLevel> {
    match value {
        Value::String(text) => LogLevel::from_keyword(text.trim()),
        Value::Number(number) => number.as_u64().and_then(numeric_level),
        _ => None,
    }
}

/// A line holding one JSON object, the shape structured loggers emit.
fn parse_json_line(line_number: usize, raw: &str, options: &ParseOptions) -> Option<LogEntry> {
    let trimmed = raw.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(trimmed) else {
        return None;
    };

    let timestamp = first_field(&fields, &["timestamp", "time", "@timestamp", "ts"])
        .and_then(|value| json_timestamp(value, options.syslog_year));
    let level = first_field(&fields, &["level", "severity", "lvl", "log.level"])
        .and_then(json_level)
        .unwrap_or(LogLevel::Info);
    let message = first_field(&fields, &["message", "msg"])
        .map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| raw.to_string());
    let service = first_field(&fields, &["service", "app"])
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(LogEntry::structured(line_number, raw, timestamp, level, message, service))
}

pub fn parse_generic_line(line_number: usize, raw: &str, options: &ParseOptions) -> LogEntry {
    if let Some(entry) = parse_json_line(line_number, raw, options) {
        return entry;
    }

    let timestamp = LEADING_TIMESTAMP_REGEX
        .captures(raw)
        .or_else(|| KEYED_TIMESTAMP_REGEX.captures(raw))
        .and_then(|caps| parse_timestamp(&caps[1], options.syslog_year));
    let level = sniff_level(raw).unwrap_or(LogLevel::Info);

    LogEntry::generic(line_number, raw, timestamp, level)
}
