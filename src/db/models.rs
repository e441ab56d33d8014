//! Database model types.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// The outcome of one check against one monitor.
///
/// `status_code` and `response_time` are either both present (an HTTP
/// exchange completed) or both absent (timeout or transport failure).
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub target_name: String,
    pub timestamp: DateTime<Utc>,
    pub status_code: Option<u16>,
    pub is_up: bool,
    /// Wall-clock duration of the exchange in seconds.
    pub response_time: Option<f64>,
}

impl ProbeResult {
    /// A completed HTTP exchange.
    pub fn responded(
        target_name: &str,
        timestamp: DateTime<Utc>,
        status_code: u16,
        response_time: f64,
        is_up: bool,
    ) -> Self {
        Self {
            target_name: target_name.to_string(),
            timestamp,
            status_code: Some(status_code),
            is_up,
            response_time: Some(response_time),
        }
    }

    /// A check that never got a response.
    pub fn failed(target_name: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            target_name: target_name.to_string(),
            timestamp,
            status_code: None,
            is_up: false,
            response_time: None,
        }
    }
}

/// A persisted check result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorRecord {
    pub id: i64,
    pub monitor_name: String,
    pub timestamp: DateTime<Utc>,
    pub status_code: Option<u16>,
    pub is_up: bool,
    pub response_time: Option<f64>,
}
