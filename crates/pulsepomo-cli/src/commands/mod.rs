pub mod config;
pub mod focus;
pub mod history;
pub mod samples;

use std::sync::Arc;

use pulsepomo_core::{Config, Database, SessionStore};

/// Open the on-disk database and the history store configured for it.
pub(crate) fn open_store(config: &Config) -> Result<(Arc<Database>, SessionStore), Box<dyn std::error::Error>> {
    let db = Arc::new(Database::open()?);
    let store = SessionStore::with_key(db.clone(), config.storage.history_key.clone());
    Ok((db, store))
}
