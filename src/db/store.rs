//! SQLite database store implementation.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Result as SqlResult, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use super::models::*;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";

/// Database error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("connection lock poisoned")]
    Poisoned,
}

/// Storage operations the monitoring engine and query layer rely on.
pub trait RecordStore: Send + Sync {
    /// Append one check result, returning the assigned record id.
    fn append(&self, result: &ProbeResult) -> Result<i64, DbError>;

    /// Records for one monitor at or after `since`, oldest first.
    fn query_range(&self, monitor_name: &str, since: DateTime<Utc>) -> Result<Vec<MonitorRecord>, DbError>;

    /// The most recent records across all monitors, newest first.
    fn query_recent(&self, limit: usize) -> Result<Vec<MonitorRecord>, DbError>;
}

/// Thread-safe database store.
///
/// A single connection sits behind a mutex, so concurrent appends from one
/// check cycle are serialised, one statement per record.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Create a new store with the given database path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    /// Initialize the database schema.
    fn init(&self) -> Result<(), DbError> {
        let conn = self.conn()?;

        conn.execute_batch(include_str!("../../migrations/000001_init.up.sql"))
            .map_err(|e| DbError::Migration(format!("Migration 1 failed: {}", e)))?;
        conn.execute_batch(include_str!("../../migrations/000002_add_indexes.up.sql"))
            .map_err(|e| DbError::Migration(format!("Migration 2 failed: {}", e)))?;

        Ok(())
    }

    /// Number of stored records across all monitors.
    pub fn count_records(&self) -> Result<i64, DbError> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM monitor_records", [], |r| r.get(0))?)
    }
}

impl RecordStore for Store {
    fn append(&self, result: &ProbeResult) -> Result<i64, DbError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO monitor_records (monitor_name, timestamp, status_code, is_up, response_time)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                result.target_name,
                result.timestamp.format(TIME_FORMAT).to_string(),
                result.status_code,
                result.is_up,
                result.response_time,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn query_range(&self, monitor_name: &str, since: DateTime<Utc>) -> Result<Vec<MonitorRecord>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, monitor_name, timestamp, status_code, is_up, response_time
             FROM monitor_records
             WHERE monitor_name = ?1 AND timestamp >= ?2
             ORDER BY timestamp ASC, id ASC",
        )?;

        let records = stmt
            .query_map(
                params![monitor_name, since.format(TIME_FORMAT).to_string()],
                record_from_row,
            )?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(records)
    }

    fn query_recent(&self, limit: usize) -> Result<Vec<MonitorRecord>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, monitor_name, timestamp, status_code, is_up, response_time
             FROM monitor_records
             ORDER BY timestamp DESC, id DESC
             LIMIT ?1",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map(params![limit], record_from_row)?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(records)
    }
}

fn record_from_row(row: &Row<'_>) -> SqlResult<MonitorRecord> {
    let time_str: String = row.get(2)?;
    let timestamp = parse_db_time(&time_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("unrecognised timestamp: {}", time_str).into(),
        )
    })?;

    Ok(MonitorRecord {
        id: row.get(0)?,
        monitor_name: row.get(1)?,
        timestamp,
        status_code: row.get(3)?,
        is_up: row.get(4)?,
        response_time: row.get(5)?,
    })
}

/// Parse a datetime string from the database.
fn parse_db_time(s: &str) -> Option<DateTime<Utc>> {
    let formats = [
        "%Y-%m-%d %H:%M:%S%.9f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];

    for fmt in &formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::NamedTempFile;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0).unwrap()
    }

    #[test]
    fn test_append_and_query_range() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        store.append(&ProbeResult::responded("api", at(0), 200, 0.12, true)).unwrap();
        store.append(&ProbeResult::failed("api", at(1))).unwrap();
        store.append(&ProbeResult::responded("web", at(2), 200, 0.3, true)).unwrap();
        store.append(&ProbeResult::responded("api", at(3), 503, 0.05, false)).unwrap();

        let records = store.query_range("api", at(1)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].timestamp, at(1));
        assert_eq!(records[0].status_code, None);
        assert_eq!(records[0].response_time, None);
        assert!(!records[0].is_up);
        assert_eq!(records[1].status_code, Some(503));
        assert_eq!(records[1].response_time, Some(0.05));

        let all = store.query_range("api", at(0) - Duration::hours(1)).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_query_recent_is_newest_first() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        for minute in 0..5 {
            store.append(&ProbeResult::responded("api", at(minute), 200, 0.1, true)).unwrap();
        }

        let recent = store.query_recent(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].timestamp, at(4));
        assert_eq!(recent[2].timestamp, at(2));
        assert_eq!(store.count_records().unwrap(), 5);
    }

    #[test]
    fn test_reopen_keeps_history() {
        let tmp = NamedTempFile::new().unwrap();
        {
            let store = Store::new(tmp.path()).unwrap();
            store.append(&ProbeResult::failed("api", at(0))).unwrap();
        }
        let store = Store::new(tmp.path()).unwrap();
        assert_eq!(store.count_records().unwrap(), 1);
    }

    #[test]
    fn test_poisoned_lock_is_an_error() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        let writer = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = writer.conn.lock().unwrap();
            panic!("writer crashed while holding the connection");
        })
        .join();

        let err = store.append(&ProbeResult::failed("api", at(0))).unwrap_err();
        assert!(matches!(err, DbError::Poisoned));
        assert!(matches!(store.query_recent(1), Err(DbError::Poisoned)));
    }

    #[test]
    fn test_parse_db_time_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_db_time("2024-01-01 12:00:00"), Some(expected));
        assert_eq!(parse_db_time("2024-01-01 12:00:00.000000000"), Some(expected));
        assert_eq!(parse_db_time("2024-01-01T12:00:00Z"), Some(expected));
        assert_eq!(parse_db_time("yesterday"), None);
    }
}
