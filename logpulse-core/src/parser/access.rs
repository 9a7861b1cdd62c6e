use super::timestamp::parse_timestamp;
use super::ParseOptions;
use crate::model::{AccessFields, LogEntry};
use regex::Regex;
use std::sync::LazyLock;

// ip ident user [timestamp] "request" status size, optionally followed by
// the combined-log referer and user agent
pub(crate) static ACCESS_LOG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\S+) \S+ \S+ \[([^\]]+)\] "([^"]*)" (\d{3}) (\d+|-)(?:\s|$)"#)
        .expect("Failed to compile access log regex")
});

pub fn is_access_line(line: &str) -> bool {
    ACCESS_LOG_REGEX.is_match(line)
}

/// Returns `None` when the line is structurally an access log line but its
/// numeric fields are out of range.
pub fn parse_access_line(line_number: usize, raw: &str, options: &ParseOptions) -> Option<LogEntry> {
    let caps = ACCESS_LOG_REGEX.captures(raw)?;

    let status_code: u16 = caps[4].parse().ok()?;
    if !(100..=599).contains(&status_code) {
        return None;
    }

    let response_size = match &caps[5] {
        "-" => None,
        size => Some(size.parse::<u64>().ok()?),
    };

    let request_line = caps[3].to_string();
    let mut parts = request_line.split_whitespace();
    let http_method = parts.next().filter(|m| *m != "-").map(str::to_string);
    let url = parts.next().map(str::to_string);

    let timestamp = parse_timestamp(&caps[2], options.syslog_year);

    Some(LogEntry::access(
        line_number,
        raw,
        timestamp,
        request_line,
        AccessFields {
            ip_address: caps[1].to_string(),
            http_method,
            url,
            status_code,
            response_size,
        },
    ))
}
