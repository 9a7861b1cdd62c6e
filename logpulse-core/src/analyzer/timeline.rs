use crate::config::{TimelineAnchor, TimelineConfig, TimelineRange, MAX_TIMELINE_WINDOWS};
use crate::model::{LogEntry, LogLevel};
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const BUCKET_KEY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineBucket {
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
}

impl TimelineBucket {
    fn add(&mut self, level: LogLevel) {
        self.total += 1;
        match level {
            LogLevel::Error | LogLevel::Critical | LogLevel::Fatal => self.errors += 1,
            LogLevel::Warning => self.warnings += 1,
            LogLevel::Info | LogLevel::Debug => self.info += 1,
        }
    }
}

pub type Timeline = BTreeMap<String, TimelineBucket>;

/// A built timeline plus the timestamped entries it could not place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineOutcome {
    pub timeline: Timeline,
    pub excluded: usize,
}

/// Start of the last window for this run.
fn last_window_start(entries: &[LogEntry], config: &TimelineConfig, now: DateTime<Utc>, window: TimeDelta) -> DateTime<Utc> {
    let anchor = match config.anchor {
        TimelineAnchor::Now => now,
        TimelineAnchor::LatestEntry => entries.iter().filter_map(|e| e.timestamp).max().unwrap_or(now),
    };
    anchor.duration_trunc(window).unwrap_or(anchor)
}

fn window_start(first: DateTime<Utc>, window: TimeDelta, steps: usize) -> Option<DateTime<Utc>> {
    first.checked_add_signed(window.checked_mul(i32::try_from(steps).ok()?)?)
}

/// Window length and the start of every window, oldest first. `None` when the
/// settings reach past the representable date range.
fn plan_windows(entries: &[LogEntry], config: &TimelineConfig, now: DateTime<Utc>) -> Option<(TimeDelta, Vec<DateTime<Utc>>)> {
    let window = TimeDelta::try_minutes(i64::from(config.window_minutes.max(1)))?;
    let window_secs = window.num_seconds();
    let last_start = last_window_start(entries, config, now, window);

    let mut count = config.window_count;
    if config.range == TimelineRange::CoverEntries {
        if let Some(earliest) = entries.iter().filter_map(|e| e.timestamp).min() {
            if earliest < last_start {
                let span = (last_start - earliest).num_seconds();
                let back = span.checked_add(window_secs - 1)? / window_secs;
                count = count.max(usize::try_from(back).ok()?.saturating_add(1));
            }
        }
    }
    let count = count.min(MAX_TIMELINE_WINDOWS);

    let back = window.checked_mul(i32::try_from(count - 1).ok()?)?;
    let first_start = last_start.checked_sub_signed(back)?;
    let starts = (0..count)
        .map(|i| window_start(first_start, window, i))
        .collect::<Option<Vec<_>>>()?;
    Some((window, starts))
}

/// Bucket entries into consecutive windows of `window_minutes`, oldest first.
/// Every window is present even when empty.
///
/// With [`TimelineRange::Fixed`] there are exactly `window_count` windows
/// ending at the anchor. [`TimelineRange::CoverEntries`] reaches further back
/// when needed so the earliest entry has a window too. Timestamped entries that
/// still fall outside the range are reported in [`TimelineOutcome::excluded`].
pub fn build_timeline(entries: &[LogEntry], config: &TimelineConfig, now: DateTime<Utc>) -> TimelineOutcome {
    let timestamped = entries.iter().filter(|e| e.timestamp.is_some()).count();
    if config.window_count == 0 {
        return TimelineOutcome {
            timeline: Timeline::new(),
            excluded: timestamped,
        };
    }

    let Some((window, starts, first_start)) = plan_windows(entries, config, now)
        .and_then(|(window, starts)| starts.first().copied().map(|first| (window, starts, first)))
    else {
        warn!(
            "Timeline of {} windows of {} minutes exceeds the supported date range, leaving it empty",
            config.window_count, config.window_minutes
        );
        return TimelineOutcome {
            timeline: Timeline::new(),
            excluded: timestamped,
        };
    };

    let window_secs = window.num_seconds();
    let mut buckets = vec![TimelineBucket::default(); starts.len()];
    let mut excluded = 0usize;

    for entry in entries {
        let Some(ts) = entry.timestamp else { continue };
        let index = (ts >= first_start)
            .then(|| usize::try_from((ts - first_start).num_seconds() / window_secs).ok())
            .flatten();
        match index.and_then(|i| buckets.get_mut(i)) {
            Some(bucket) => bucket.add(entry.level),
            None => excluded += 1,
        }
    }

    if excluded > 0 {
        debug!(
            "{} timestamped entries fall outside the timeline starting {} ({} windows)",
            excluded,
            first_start.format(BUCKET_KEY_FORMAT),
            starts.len()
        );
    }

    let timeline = starts
        .into_iter()
        .zip(buckets)
        .map(|(start, bucket)| (start.format(BUCKET_KEY_FORMAT).to_string(), bucket))
        .collect();
    TimelineOutcome { timeline, excluded }
}
