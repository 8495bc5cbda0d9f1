//! SQLite-backed persistence.
//!
//! Provides:
//! - A key-value blob table, used as the production [`BlobStore`]
//! - A timestamped biometric sample log

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{data_dir, BlobStore};
use crate::biometrics::{Metric, Sample};
use crate::error::StoreError;

/// SQLite database holding the session history blob and sample log.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `<data_dir>/pulsepomo.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn open() -> Result<Self, StoreError> {
        let dir = data_dir().map_err(|e| StoreError::ReadFailed(e.to_string()))?;
        Self::open_at(&dir.join("pulsepomo.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value BLOB NOT NULL
            );

            CREATE TABLE IF NOT EXISTS biometric_samples (
                id     INTEGER PRIMARY KEY AUTOINCREMENT,
                metric TEXT NOT NULL,
                value  REAL NOT NULL,
                at_ms  INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_samples_metric_at ON biometric_samples(metric, at_ms);",
        )?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let conn = self.conn.lock()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    /// Append one biometric sample to the log.
    pub fn insert_sample(&self, sample: &Sample) -> Result<i64, StoreError> {
        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO biometric_samples (metric, value, at_ms) VALUES (?1, ?2, ?3)",
            params![sample.metric.as_str(), sample.value, sample.at.timestamp_millis()],
        )
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        Ok(conn.last_insert_rowid())
    }

    /// Samples of `metric` taken within `[from, to]`, oldest first.
    pub fn samples_between(
        &self,
        metric: Metric,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Sample>, StoreError> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT value, at_ms FROM biometric_samples
             WHERE metric = ?1 AND at_ms >= ?2 AND at_ms <= ?3
             ORDER BY at_ms ASC",
        )?;
        let rows = stmt.query_map(
            params![metric.as_str(), from.timestamp_millis(), to.timestamp_millis()],
            |row| Ok((row.get::<_, f64>(0)?, row.get::<_, i64>(1)?)),
        )?;

        let mut samples = Vec::new();
        for row in rows {
            let (value, at_ms) = row?;
            if let Some(at) = Utc.timestamp_millis_opt(at_ms).single() {
                samples.push(Sample::new(metric, value, at));
            }
        }
        Ok(samples)
    }

    /// The most recent `limit` samples across all metrics, newest first.
    pub fn recent_samples(&self, limit: usize) -> Result<Vec<Sample>, StoreError> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT metric, value, at_ms FROM biometric_samples
             ORDER BY at_ms DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut samples = Vec::new();
        for row in rows {
            let (metric, value, at_ms) = row?;
            let (Ok(metric), Some(at)) = (
                metric.parse::<Metric>(),
                Utc.timestamp_millis_opt(at_ms).single(),
            ) else {
                continue;
            };
            samples.push(Sample::new(metric, value, at));
        }
        Ok(samples)
    }
}

impl BlobStore for Database {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.kv_get(key)
    }

    fn set(&self, key: &str, blob: &[u8]) -> Result<(), StoreError> {
        self.kv_set(key, blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", b"hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), b"hello");
        db.kv_set("test", b"world").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), b"world");
    }

    #[test]
    fn samples_between_filters_by_metric_and_range() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        db.insert_sample(&Sample::new(Metric::HeartRate, 72.0, now - Duration::seconds(30)))
            .unwrap();
        db.insert_sample(&Sample::new(Metric::HeartRate, 90.0, now - Duration::seconds(300)))
            .unwrap();
        db.insert_sample(&Sample::new(Metric::RespiratoryRate, 14.0, now))
            .unwrap();

        let hr = db
            .samples_between(Metric::HeartRate, now - Duration::seconds(60), now)
            .unwrap();
        assert_eq!(hr.len(), 1);
        assert_eq!(hr[0].value, 72.0);
    }

    #[test]
    fn recent_samples_newest_first() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        db.insert_sample(&Sample::new(Metric::HeartRate, 60.0, now - Duration::seconds(10)))
            .unwrap();
        db.insert_sample(&Sample::new(Metric::RespiratoryRate, 12.0, now))
            .unwrap();

        let recent = db.recent_samples(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].metric, Metric::RespiratoryRate);
        assert_eq!(db.recent_samples(1).unwrap().len(), 1);
    }
}
