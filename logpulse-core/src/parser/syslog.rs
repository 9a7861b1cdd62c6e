use super::generic::{sniff_level, LEVEL_KEYWORDS};
use super::timestamp::parse_timestamp;
use super::ParseOptions;
use crate::model::{LogEntry, LogLevel};
use regex::Regex;
use std::sync::LazyLock;

// <PRI>Mon dd HH:MM:SS host tag[pid]: message
static BSD_SYSLOG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:<(?P<pri>\d{1,3})>)?(?P<ts>[A-Z][a-z]{2}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2})\s+(?P<host>\S+)\s+(?P<tag>[^:\[\s]+)(?:\[\d+\])?:\s*(?P<msg>.*)$",
    )
    .expect("Failed to compile syslog regex")
});

// [timestamp] [host] <severity> message, where the severity is bracketed or
// followed by a colon
static DELIMITED_SEVERITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    let timestamp = [
        r"\[?\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?(?:Z|[+-]\d{2}:?\d{2})?\]?",
        r"\[[A-Z][a-z]{2} [A-Z][a-z]{2} [ \d]?\d \d{2}:\d{2}:\d{2}(?:\.\d+)? \d{4}\]",
        r"[A-Z][a-z]{2}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2}",
    ]
    .join("|");
    let pattern = format!(
        r"^(?:(?P<ts>{ts})\s+(?:(?P<host>[A-Za-z][\w.-]*)\s+)?)?(?:[\[(<](?P<bracketed>(?i:{kw}))[\])>]|(?P<colon>(?i:{kw})):)(?:\s+(?P<msg>.*))?$",
        ts = timestamp,
        kw = LEVEL_KEYWORDS,
    );
    Regex::new(&pattern).expect("Failed to compile delimited severity regex")
});

pub fn is_syslog_line(line: &str) -> bool {
    BSD_SYSLOG_REGEX.is_match(line) || DELIMITED_SEVERITY_REGEX.is_match(line)
}

pub fn parse_syslog_line(line_number: usize, raw: &str, options: &ParseOptions) -> Option<LogEntry> {
    if let Some(caps) = BSD_SYSLOG_REGEX.captures(raw) {
        let message = caps["msg"].to_string();
        let level = caps
            .name("pri")
            .and_then(|pri| pri.as_str().parse::<u16>().ok())
            .filter(|pri| *pri <= 191)
            .map(|pri| LogLevel::from_syslog_severity((pri % 8) as u8))
            .or_else(|| sniff_level(&message))
            .unwrap_or(LogLevel::Info);

        return Some(LogEntry::syslog(
            line_number,
            raw,
            parse_timestamp(&caps["ts"], options.syslog_year),
            level,
            message,
            Some(caps["host"].to_string()),
            Some(caps["tag"].to_string()),
        ));
    }

    let caps = DELIMITED_SEVERITY_REGEX.captures(raw)?;
    let keyword = caps.name("bracketed").or_else(|| caps.name("colon"))?;
    let level = LogLevel::from_keyword(keyword.as_str())?;
    let timestamp = caps
        .name("ts")
        .and_then(|ts| parse_timestamp(ts.as_str(), options.syslog_year));
    let message = caps
        .name("msg")
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    Some(LogEntry::syslog(
        line_number,
        raw,
        timestamp,
        level,
        message,
        caps.name("host").map(|h| h.as_str().to_string()),
        None,
    ))
}
