//! Bucketing of stored records.

use super::Interval;
use crate::config::AppSettings;
use crate::db::MonitorRecord;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;

/// Slack for float comparison against the percentage threshold.
const EPSILON: f64 = 1e-9;

/// A closed time range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    /// The `hours` leading up to `end`, or `None` if the start is not
    /// representable.
    pub fn ending_at(end: DateTime<Utc>, hours: i64) -> Option<Self> {
        let span = ChronoDuration::try_hours(hours)?;
        let start = end.checked_sub_signed(span)?;
        Some(Self { start, end })
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// Thresholds that mark a bucket degraded. An absent threshold is not checked.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DegradedThresholds {
    /// Minimum number of down checks.
    pub down_count: Option<u32>,
    /// Failure fraction; degraded when uptime <= 1 - fraction.
    pub failure_fraction: Option<f64>,
}

impl From<&AppSettings> for DegradedThresholds {
    fn from(settings: &AppSettings) -> Self {
        Self {
            down_count: settings.degraded_threshold,
            failure_fraction: settings.degraded_percentage_threshold,
        }
    }
}

impl DegradedThresholds {
    /// A bucket with no down checks is never degraded.
    pub fn is_degraded(&self, up_count: u32, down_count: u32) -> bool {
        if down_count == 0 {
            return false;
        }

        let uptime = up_count as f64 / (up_count + down_count) as f64;
        let by_count = self.down_count.is_some_and(|min| down_count >= min);
        let by_fraction = self
            .failure_fraction
            .is_some_and(|fraction| uptime <= 1.0 - fraction + EPSILON);

        by_count || by_fraction
    }
}

/// Summary of the checks inside one bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedBucket {
    pub bucket_start: DateTime<Utc>,
    pub bucket_end: DateTime<Utc>,
    pub up_count: u32,
    pub down_count: u32,
    /// Mean over checks that carried a response time; absent if none did.
    pub average_response_time: Option<f64>,
    /// `up / (up + down)`, absent for an empty bucket.
    pub uptime_percentage: Option<f64>,
    pub degraded: bool,
}

#[derive(Debug, Default)]
struct Tally {
    up: u32,
    down: u32,
    response_sum: f64,
    response_count: u32,
}

impl Tally {
    fn add(&mut self, record: &MonitorRecord) {
        if record.is_up {
            self.up += 1;
        } else {
            self.down += 1;
        }
        if let Some(rt) = record.response_time {
            self.response_sum += rt;
            self.response_count += 1;
        }
    }

    fn finish(
        &self,
        bucket_start: DateTime<Utc>,
        bucket_end: DateTime<Utc>,
        thresholds: &DegradedThresholds,
    ) -> AggregatedBucket {
        let total = self.up + self.down;
        AggregatedBucket {
            bucket_start,
            bucket_end,
            up_count: self.up,
            down_count: self.down,
            average_response_time: (self.response_count > 0)
                .then(|| self.response_sum / self.response_count as f64),
            uptime_percentage: (total > 0).then(|| self.up as f64 / total as f64),
            degraded: thresholds.is_degraded(self.up, self.down),
        }
    }
}

/// Bucket `records` (ascending by timestamp) over `window`.
///
/// `All` yields a single bucket spanning the window. Other intervals yield
/// `ceil(window / width)` contiguous buckets starting exactly at
/// `window.start`, the last one clipped to `window.end`; empty buckets are
/// kept. Records outside the window are ignored.
pub fn aggregate(
    records: &[MonitorRecord],
    interval: Interval,
    window: Window,
    thresholds: DegradedThresholds,
) -> Vec<AggregatedBucket> {
    let in_window = records.iter().filter(|r| window.contains(r.timestamp));

    let Some(width) = interval.width() else {
        let mut tally = Tally::default();
        in_window.for_each(|r| tally.add(r));
        return vec![tally.finish(window.start, window.end, &thresholds)];
    };

    let span_ms = (window.end - window.start).num_milliseconds();
    let width_ms = width.num_milliseconds();
    if span_ms <= 0 || width_ms <= 0 {
        return Vec::new();
    }

    let count = ((span_ms + width_ms - 1) / width_ms) as usize;
    let mut tallies: Vec<Tally> = (0..count).map(|_| Tally::default()).collect();

    for record in in_window {
        let offset_ms = (record.timestamp - window.start).num_milliseconds();
        // A record exactly at window.end belongs to the last bucket.
        let index = ((offset_ms / width_ms) as usize).min(count - 1);
        tallies[index].add(record);
    }

    tallies
        .iter()
        .enumerate()
        .map(|(i, tally)| {
            let start = window.start + width * i as i32;
            let end = (start + width).min(window.end);
            tally.finish(start, end, &thresholds)
        })
        .collect()
}
