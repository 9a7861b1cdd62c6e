use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// Formats carrying an explicit offset.
const OFFSET_FORMATS: &[&str] = &[
    "%d/%b/%Y:%H:%M:%S %z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

/// Formats without an offset; interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%d/%b/%Y:%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%a %b %d %H:%M:%S%.f %Y",
];

/// Parse any of the timestamp shapes the line parsers extract.
///
/// Year-less syslog stamps (`Jan 15 10:30:00`) take `syslog_year`.
/// Returns `None` rather than failing; callers keep the entry either way.
pub fn parse_timestamp(raw: &str, syslog_year: i32) -> Option<DateTime<Utc>> {
    let cleaned = normalize(raw);
    let text = cleaned.as_str();

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::<FixedOffset>::parse_from_str(text, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    let with_year = format!("{} {}", syslog_year, text);
    for format in ["%Y %b %d %H:%M:%S%.f", "%Y %a %b %d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&with_year, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    None
}

fn normalize(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
    let mut text = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");

    // 2024-01-15 10:30:00,123 (log4j style) -> 2024-01-15 10:30:00.123
    if let Some(pos) = text.find(',') {
        if text[..pos].ends_with(|c: char| c.is_ascii_digit()) && pos >= 19 {
            text.replace_range(pos..pos + 1, ".");
        }
    }

    if let Some(stripped) = text.strip_suffix('Z') {
        text = format!("{}+00:00", stripped);
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn ymd_hms(dt: DateTime<Utc>) -> (i32, u32, u32, u32, u32, u32) {
        (dt.year(), dt.month(), dt.day(), dt.hour(), dt.minute(), dt.second())
    }

    #[test]
    fn test_access_log_timestamp_with_offset() {
        let dt = parse_timestamp("15/Jan/2024:10:30:00 +0200", 2000).unwrap();
        assert_eq!(ymd_hms(dt), (2024, 1, 15, 8, 30, 0));
    }

    #[test]
    fn test_iso_variants() {
        let expected = (2024, 1, 15, 10, 30, 0);
        for raw in [
            "2024-01-15T10:30:00Z",
            "2024-01-15 10:30:00",
            "2024-01-15T10:30:00.123Z",
            "2024-01-15 10:30:00,123",
            "2024-01-15T10:30:00+00:00",
            "[2024-01-15 10:30:00]",
        ] {
            let dt = parse_timestamp(raw, 2000).unwrap_or_else(|| panic!("failed on {}", raw));
            assert_eq!(ymd_hms(dt), expected, "for {}", raw);
        }
    }

    #[test]
    fn test_syslog_uses_supplied_year() {
        let dt = parse_timestamp("Jan  5 10:30:00", 2023).unwrap();
        assert_eq!(ymd_hms(dt), (2023, 1, 5, 10, 30, 0));
    }

    #[test]
    fn test_apache_error_log_timestamp() {
        let dt = parse_timestamp("Thu Jun 09 06:07:04 2005", 2000).unwrap();
        assert_eq!(ymd_hms(dt), (2005, 6, 9, 6, 7, 4));
    }

    #[test]
    fn test_unparseable_timestamp() {
        assert!(parse_timestamp("yesterday at noon", 2024).is_none());
        assert!(parse_timestamp("", 2024).is_none());
        assert!(parse_timestamp("2024-13-45 99:99:99", 2024).is_none());
    }
}
