//! SQLite database store implementation.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use super::models::*;

/// Timestamps are stored as fixed-width text so lexical order matches time order.
const DB_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";

/// Database error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Not found")]
    NotFound,
    #[error("database lock poisoned")]
    LockPoisoned,
}

/// Storage operations the monitor core depends on.
///
/// Calls are synchronous; implementations handle their own connection-level
/// locking.
pub trait MonitorStore: Send + Sync {
    /// All registered endpoints, ordered by name (ties by id).
    fn list_endpoints(&self) -> Result<Vec<Endpoint>, DbError>;

    /// Append one check record and return its id.
    fn record_check(
        &self,
        endpoint_id: i64,
        is_up: bool,
        response_time_ms: Option<f64>,
        checked_at: DateTime<Utc>,
    ) -> Result<i64, DbError>;

    /// Check records with `start <= checked_at <= end`, in log order.
    fn checks_between(
        &self,
        endpoint_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CheckRecord>, DbError>;

    /// Persist the latest status and uptime for an endpoint.
    fn update_status(
        &self,
        endpoint_id: i64,
        is_up: bool,
        uptime: f64,
        checked_at: DateTime<Utc>,
    ) -> Result<(), DbError>;
}

/// Thread-safe database store.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open the database at the given path and initialize its schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<(), DbError> {
        let conn = self.conn()?;
        conn.execute_batch(include_str!("../../migrations/000001_init.up.sql"))
            .map_err(|e| DbError::Migration(format!("Migration 1 failed: {}", e)))?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    // --- Endpoint registry ---

    /// Register a new endpoint. It starts with unknown status and no checks.
    pub fn add_endpoint(&self, new: &NewEndpoint) -> Result<Endpoint, DbError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO endpoints (name, url) VALUES (?1, ?2)",
            params![new.name, new.url],
        )?;
        Ok(Endpoint {
            id: conn.last_insert_rowid(),
            name: new.name.clone(),
            url: new.url.clone(),
            ..Default::default()
        })
    }

    /// Get an endpoint by ID.
    pub fn get_endpoint(&self, id: i64) -> Result<Endpoint, DbError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, url, status, uptime, last_check FROM endpoints WHERE id = ?1",
            params![id],
            endpoint_from_row,
        )
        .optional()?
        .ok_or(DbError::NotFound)
    }

    /// Find the first endpoint registered with the given URL.
    pub fn find_endpoint_by_url(&self, url: &str) -> Result<Option<Endpoint>, DbError> {
        let conn = self.conn()?;
        let endpoint = conn
            .query_row(
                "SELECT id, name, url, status, uptime, last_check FROM endpoints
                 WHERE url = ?1 ORDER BY id LIMIT 1",
                params![url],
                endpoint_from_row,
            )
            .optional()?;
        Ok(endpoint)
    }

    // --- Check log maintenance ---

    /// Delete check records older than the cutoff. Returns the number removed.
    pub fn delete_checks_before(&self, cutoff: DateTime<Utc>) -> Result<usize, DbError> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM endpoint_checks WHERE checked_at < ?1",
            params![format_db_time(cutoff)],
        )?;
        Ok(removed)
    }

    /// Total number of stored check records.
    pub fn count_checks(&self) -> Result<i64, DbError> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM endpoint_checks", [], |r| r.get(0))?)
    }
}

impl MonitorStore for Store {
    fn list_endpoints(&self) -> Result<Vec<Endpoint>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, url, status, uptime, last_check FROM endpoints ORDER BY name, id",
        )?;

        let endpoints = stmt
            .query_map([], endpoint_from_row)?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(endpoints)
    }

    fn record_check(
        &self,
        endpoint_id: i64,
        is_up: bool,
        response_time_ms: Option<f64>,
        checked_at: DateTime<Utc>,
    ) -> Result<i64, DbError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO endpoint_checks (endpoint_id, checked_at, is_up, response_time_ms)
             VALUES (?1, ?2, ?3, ?4)",
            params![endpoint_id, format_db_time(checked_at), is_up, response_time_ms],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn checks_between(
        &self,
        endpoint_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CheckRecord>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, endpoint_id, checked_at, is_up, response_time_ms FROM endpoint_checks
             WHERE endpoint_id = ?1 AND checked_at >= ?2 AND checked_at <= ?3
             ORDER BY checked_at ASC, id ASC",
        )?;

        let checks = stmt
            .query_map(
                params![endpoint_id, format_db_time(start), format_db_time(end)],
                |row| {
                    Ok(CheckRecord {
                        id: row.get(0)?,
                        endpoint_id: row.get(1)?,
                        checked_at: time_column(row, 2)?,
                        is_up: row.get(3)?,
                        response_time_ms: row.get(4)?,
                    })
                },
            )?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(checks)
    }

    fn update_status(
        &self,
        endpoint_id: i64,
        is_up: bool,
        uptime: f64,
        checked_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE endpoints SET status = ?1, uptime = ?2, last_check = ?3 WHERE id = ?4",
            params![
                EndpointStatus::from_outcome(is_up).as_str(),
                uptime,
                format_db_time(checked_at),
                endpoint_id,
            ],
        )?;
        if updated == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}

fn endpoint_from_row(row: &Row<'_>) -> SqlResult<Endpoint> {
    let status: String = row.get(3)?;
    let status = status.parse::<EndpointStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into())
    })?;
    let last_check: Option<String> = row.get(5)?;
    let last_check = match last_check {
        Some(s) => Some(parse_time_text(5, &s)?),
        None => None,
    };

    Ok(Endpoint {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        status,
        uptime: row.get(4)?,
        last_check,
    })
}

fn time_column(row: &Row<'_>, idx: usize) -> SqlResult<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    parse_time_text(idx, &s)
}

fn parse_time_text(idx: usize, s: &str) -> SqlResult<DateTime<Utc>> {
    parse_db_time(s).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp: {}", s).into(),
        )
    })
}

fn format_db_time(dt: DateTime<Utc>) -> String {
    dt.format(DB_TIME_FORMAT).to_string()
}

/// Parse a datetime string from the database.
fn parse_db_time(s: &str) -> Option<DateTime<Utc>> {
    let formats = [
        DB_TIME_FORMAT,
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];

    for fmt in &formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }

    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use tempfile::NamedTempFile;

    fn new_store() -> (NamedTempFile, Store) {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();
        (tmp, store)
    }

    fn add(store: &Store, name: &str, url: &str) -> Endpoint {
        store
            .add_endpoint(&NewEndpoint {
                name: name.to_string(),
                url: url.to_string(),
            })
            .unwrap()
    }

    #[test]
    fn test_endpoint_registry() {
        let (_tmp, store) = new_store();

        let created = add(&store, "Docs", "https://docs.example.com");
        assert!(created.id > 0);

        let fetched = store.get_endpoint(created.id).unwrap();
        assert_eq!(fetched.name, "Docs");
        assert_eq!(fetched.status, EndpointStatus::Unknown);
        assert_eq!(fetched.uptime, 100.0);
        assert!(fetched.last_check.is_none());

        let by_url = store.find_endpoint_by_url("https://docs.example.com").unwrap();
        assert_eq!(by_url.map(|e| e.id), Some(created.id));
        assert!(store.find_endpoint_by_url("https://nope.example.com").unwrap().is_none());
        assert!(matches!(store.get_endpoint(created.id + 1), Err(DbError::NotFound)));
    }

    #[test]
    fn test_list_endpoints_ordered_by_name() {
        let (_tmp, store) = new_store();
        add(&store, "zeta", "https://z.example.com");
        add(&store, "alpha", "https://a.example.com");
        add(&store, "mid", "https://m.example.com");

        let names: Vec<String> = store
            .list_endpoints()
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_checks_between_is_inclusive_and_keeps_insertion_order() {
        let (_tmp, store) = new_store();
        let ep = add(&store, "api", "https://api.example.com");
        let other = add(&store, "other", "https://other.example.com");
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        store.record_check(ep.id, true, Some(10.0), t - ChronoDuration::seconds(10)).unwrap();
        let first = store.record_check(ep.id, false, None, t).unwrap();
        let second = store.record_check(ep.id, true, Some(30.0), t).unwrap();
        store.record_check(ep.id, true, Some(5.0), t + ChronoDuration::seconds(1)).unwrap();
        store.record_check(other.id, false, Some(1.0), t).unwrap();

        let checks = store.checks_between(ep.id, t - ChronoDuration::seconds(10), t).unwrap();
        assert_eq!(checks.len(), 3);
        assert_eq!(checks[1].id, first);
        assert_eq!(checks[2].id, second);
        assert!(checks[1].response_time_ms.is_none());
        assert_eq!(checks[2].response_time_ms, Some(30.0));
        assert!(checks.iter().all(|c| c.endpoint_id == ep.id));
    }

    #[test]
    fn test_update_status() {
        let (_tmp, store) = new_store();
        let ep = add(&store, "api", "https://api.example.com");
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        store.update_status(ep.id, false, 97.5, at).unwrap();

        let fetched = store.get_endpoint(ep.id).unwrap();
        assert_eq!(fetched.status, EndpointStatus::Down);
        assert_eq!(fetched.uptime, 97.5);
        assert_eq!(fetched.last_check, Some(at));

        assert!(matches!(
            store.update_status(ep.id + 100, true, 100.0, at),
            Err(DbError::NotFound)
        ));
    }

    #[test]
    fn test_delete_checks_before() {
        let (_tmp, store) = new_store();
        let ep = add(&store, "api", "https://api.example.com");
        let now = Utc::now();

        store.record_check(ep.id, true, Some(1.0), now - ChronoDuration::days(400)).unwrap();
        store.record_check(ep.id, true, Some(1.0), now - ChronoDuration::days(1)).unwrap();

        let removed = store.delete_checks_before(now - ChronoDuration::days(365)).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count_checks().unwrap(), 1);
    }

    #[test]
    fn test_parse_db_time_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(parse_db_time("2024-01-02 03:04:05.000000000"), Some(expected));
        assert_eq!(parse_db_time("2024-01-02 03:04:05"), Some(expected));
        assert_eq!(parse_db_time("2024-01-02T03:04:05Z"), Some(expected));
        assert!(parse_db_time("yesterday").is_none());
    }
}
