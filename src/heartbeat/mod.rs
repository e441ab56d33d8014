//! Heartbeat aggregation for display.
//!
//! Turns a monitor's stored history over a look-back window into fixed-width
//! buckets of up/down counts, mean response time and a degraded flag.

mod aggregate;

pub use aggregate::*;

use crate::config::AppSettings;
use crate::db::{DbError, RecordStore};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Longest look-back a query may ask for: one year.
pub const MAX_WINDOW_HOURS: i64 = 24 * 365;

/// Heartbeat query error types.
#[derive(Error, Debug)]
pub enum HeartbeatError {
    #[error("Invalid interval '{0}'. Must be one of: all, hour, day, week")]
    InvalidInterval(String),
    #[error("Invalid window: hours must be between 1 and {max}, got {0}", max = MAX_WINDOW_HOURS)]
    InvalidWindow(i64),
    #[error("Monitor '{0}' not found or no data available")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(#[from] DbError),
}

/// Bucket width of a heartbeat query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    /// One bucket spanning the whole window.
    All,
    Hour,
    Day,
    Week,
}

impl Interval {
    /// Bucket width, `None` for [`Interval::All`].
    pub fn width(&self) -> Option<ChronoDuration> {
        match self {
            Interval::All => None,
            Interval::Hour => Some(ChronoDuration::hours(1)),
            Interval::Day => Some(ChronoDuration::days(1)),
            Interval::Week => Some(ChronoDuration::weeks(1)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::All => "all",
            Interval::Hour => "hour",
            Interval::Day => "day",
            Interval::Week => "week",
        }
    }
}

impl FromStr for Interval {
    type Err = HeartbeatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Interval::All),
            "hour" => Ok(Interval::Hour),
            "day" => Ok(Interval::Day),
            "week" => Ok(Interval::Week),
            other => Err(HeartbeatError::InvalidInterval(other.to_string())),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated heartbeat for one monitor.
#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatSummary {
    pub monitor_name: String,
    pub interval: Interval,
    #[serde(rename = "heartbeat")]
    pub buckets: Vec<AggregatedBucket>,
}

/// Aggregate the last `hours` of history for `monitor_name`.
///
/// Fails with [`HeartbeatError::InvalidInterval`] for an unknown interval,
/// [`HeartbeatError::InvalidWindow`] for `hours` outside
/// `1..=MAX_WINDOW_HOURS` and [`HeartbeatError::NotFound`] when the window
/// holds no records.
pub fn get_aggregated_heartbeat(
    store: &dyn RecordStore,
    settings: &AppSettings,
    monitor_name: &str,
    interval: &str,
    hours: i64,
) -> Result<HeartbeatSummary, HeartbeatError> {
    let interval: Interval = interval.parse()?;

    get_aggregated_heartbeat_at(store, settings, monitor_name, interval, hours, Utc::now())
}

/// As [`get_aggregated_heartbeat`], with the window ending at `now`.
pub fn get_aggregated_heartbeat_at(
    store: &dyn RecordStore,
    settings: &AppSettings,
    monitor_name: &str,
    interval: Interval,
    hours: i64,
    now: DateTime<Utc>,
) -> Result<HeartbeatSummary, HeartbeatError> {
    if !(1..=MAX_WINDOW_HOURS).contains(&hours) {
        return Err(HeartbeatError::InvalidWindow(hours));
    }
    let window = Window::ending_at(now, hours).ok_or(HeartbeatError::InvalidWindow(hours))?;

    let mut records = store.query_range(monitor_name, window.start)?;
    records.retain(|r| window.contains(r.timestamp));

    if records.is_empty() {
        return Err(HeartbeatError::NotFound(monitor_name.to_string()));
    }

    let buckets = aggregate(&records, interval, window, DegradedThresholds::from(settings));

    Ok(HeartbeatSummary {
        monitor_name: monitor_name.to_string(),
        interval,
        buckets,
    })
}
