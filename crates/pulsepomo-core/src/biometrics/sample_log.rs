use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Authorization, BiometricProvider, Metric, Sample};
use crate::error::{BiometricError, StoreError};
use crate::storage::Database;

/// Provider backed by the local sample table.
///
/// Samples are recorded with `pulsepomo samples add` or by any other process
/// writing to the same database.
#[derive(Clone)]
pub struct SampleLog {
    db: Arc<Database>,
}

impl SampleLog {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn record(&self, sample: &Sample) -> Result<i64, StoreError> {
        self.db.insert_sample(sample)
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<Sample>, StoreError> {
        self.db.recent_samples(limit)
    }
}

#[async_trait]
impl BiometricProvider for SampleLog {
    async fn request_authorization(&self) -> Authorization {
        // The local log is always readable.
        Authorization::Granted
    }

    async fn samples(
        &self,
        metric: Metric,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Sample>, BiometricError> {
        self.db
            .samples_between(metric, from, to)
            .map_err(|e| BiometricError::QueryFailed {
                metric: metric.to_string(),
                message: e.to_string(),
            })
    }
}
