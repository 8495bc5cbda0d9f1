mod config;
pub mod database;
mod session_store;

pub use config::{BiometricsConfig, Config, StorageConfig, TimerConfig};
pub use database::Database;
pub use session_store::{SessionStore, DEFAULT_HISTORY_KEY};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::{ConfigError, StoreError};

/// Returns the data directory, creating it if needed.
///
/// `PULSEPOMO_DATA_DIR` overrides the location outright. Otherwise this is
/// `~/.config/pulsepomo[-dev]/`, with `PULSEPOMO_ENV=dev` selecting the
/// development directory.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("PULSEPOMO_DATA_DIR") {
        Some(custom) if !custom.is_empty() => PathBuf::from(custom),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("PULSEPOMO_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("pulsepomo-dev")
            } else {
                base_dir.join("pulsepomo")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Key-value store of opaque blobs.
///
/// Values are read and written whole; there is no partial query API.
pub trait BlobStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn set(&self, key: &str, blob: &[u8]) -> Result<(), StoreError>;
}

/// Blob store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    reject_writes: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set` fail, simulating a full or read-only store.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, blob: &[u8]) -> Result<(), StoreError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed(format!("write to '{key}' rejected")));
        }
        self.entries.lock()?.insert(key.to_string(), blob.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip_and_rejection() {
        let store = MemoryBlobStore::new();
        assert!(store.get("k").unwrap().is_none());
        store.set("k", b"v1").unwrap();
        assert_eq!(store.get("k").unwrap().unwrap(), b"v1");

        store.reject_writes(true);
        assert!(matches!(store.set("k", b"v2"), Err(StoreError::WriteFailed(_))));
        assert_eq!(store.get("k").unwrap().unwrap(), b"v1");
    }
}
