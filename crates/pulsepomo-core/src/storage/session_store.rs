//! Append-only session history.
//!
//! The whole history lives under one key as a JSON array; each element is one
//! encoded [`SessionRecord`]. Elements are decoded independently so a single
//! bad entry cannot hide the rest of the history.

use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

use super::BlobStore;
use crate::error::StoreError;
use crate::session::SessionRecord;

pub const DEFAULT_HISTORY_KEY: &str = "pomodoros";

pub struct SessionStore {
    blobs: Arc<dyn BlobStore>,
    key: String,
    /// Serializes read-modify-write in `append`.
    write_lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self::with_key(blobs, DEFAULT_HISTORY_KEY)
    }

    pub fn with_key(blobs: Arc<dyn BlobStore>, key: impl Into<String>) -> Self {
        Self {
            blobs,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Append `record` to the end of the history.
    ///
    /// # Errors
    /// Fails if the record cannot be encoded, the stored list is unreadable,
    /// or the backing store rejects the write. The history is left untouched
    /// in every case.
    pub fn append(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock()?;

        let mut entries = self.read_entries()?;
        let encoded = serde_json::to_value(record).map_err(StoreError::Encode)?;
        entries.push(encoded);
        let bytes = serde_json::to_vec(&entries).map_err(StoreError::Encode)?;

        if let Err(e) = self.blobs.set(&self.key, &bytes) {
            error!(id = %record.id, error = %e, "failed to persist session record");
            return Err(e);
        }
        info!(id = %record.id, total = entries.len(), "session record appended");
        Ok(())
    }

    /// Every decodable record, in append order.
    pub fn load_all(&self) -> Result<Vec<SessionRecord>, StoreError> {
        let entries = self.read_entries()?;
        let mut records = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<SessionRecord>(entry) {
                Ok(record) => records.push(record),
                Err(e) => warn!(index, error = %e, "skipping undecodable session record"),
            }
        }
        Ok(records)
    }

    fn read_entries(&self) -> Result<Vec<serde_json::Value>, StoreError> {
        match self.blobs.get(&self.key)? {
            None => Ok(Vec::new()),
            Some(bytes) if bytes.is_empty() => Ok(Vec::new()),
            Some(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| StoreError::CorruptHistory {
                    key: self.key.clone(),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FocusSummary;
    use crate::storage::MemoryBlobStore;
    use chrono::Utc;

    fn record(heart_rate: u32, duration_seconds: u64) -> SessionRecord {
        let summary = FocusSummary {
            start_date: Utc::now(),
            cycles: 1,
            total_focused_seconds: duration_seconds,
        };
        SessionRecord::from_summary(&summary, heart_rate, 14, Utc::now())
    }

    #[test]
    fn empty_store_loads_nothing() {
        let store = SessionStore::new(Arc::new(MemoryBlobStore::new()));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn append_preserves_order_and_boundary_values() {
        let store = SessionStore::new(Arc::new(MemoryBlobStore::new()));
        let first = record(72, 1500);
        let last = record(0, 1);
        store.append(&first).unwrap();
        store.append(&last).unwrap();

        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], first);
        assert_eq!(all.last(), Some(&last));
    }

    #[test]
    fn undecodable_entry_is_skipped() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let store = SessionStore::new(blobs.clone());
        store.append(&record(70, 60)).unwrap();

        let mut raw: Vec<serde_json::Value> =
            serde_json::from_slice(&blobs.get(DEFAULT_HISTORY_KEY).unwrap().unwrap()).unwrap();
        raw.push(serde_json::json!({"heartRate": "not a number"}));
        blobs
            .set(DEFAULT_HISTORY_KEY, &serde_json::to_vec(&raw).unwrap())
            .unwrap();

        let good = record(80, 120);
        store.append(&good).unwrap();

        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1], good);
    }

    #[test]
    fn rejected_write_is_reported_and_history_kept() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let store = SessionStore::new(blobs.clone());
        store.append(&record(70, 60)).unwrap();

        blobs.reject_writes(true);
        let err = store.append(&record(75, 60)).unwrap_err();
        assert!(matches!(err, StoreError::WriteFailed(_)));
        assert_eq!(store.load_all().unwrap().len(), 1);
    }

    #[test]
    fn corrupt_history_blocks_append() {
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs.set(DEFAULT_HISTORY_KEY, b"{not json").unwrap();
        let store = SessionStore::new(blobs.clone());

        assert!(matches!(
            store.append(&record(70, 60)),
            Err(StoreError::CorruptHistory { .. })
        ));
        assert_eq!(blobs.get(DEFAULT_HISTORY_KEY).unwrap().unwrap(), b"{not json");
    }

    #[test]
    fn concurrent_appends_are_not_lost() {
        let store = Arc::new(SessionStore::new(Arc::new(MemoryBlobStore::new())));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || store.append(&record(60 + i, 60)).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.load_all().unwrap().len(), 8);
    }

    #[test]
    fn custom_key_isolates_histories() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let a = SessionStore::with_key(blobs.clone(), "a");
        let b = SessionStore::with_key(blobs, "b");
        a.append(&record(70, 60)).unwrap();
        assert_eq!(a.load_all().unwrap().len(), 1);
        assert!(b.load_all().unwrap().is_empty());
        assert_eq!(b.key(), "b");
    }
}
