use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Authorization, BiometricProvider, Metric, Sample};
use crate::error::BiometricError;

/// In-memory provider, used for tests and simulations.
///
/// Clones share the same sample buffer.
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    samples: Arc<Mutex<Vec<Sample>>>,
    authorization: Authorization,
    failure: Option<String>,
    delay: Option<Duration>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self {
            samples: Arc::new(Mutex::new(Vec::new())),
            authorization: Authorization::Granted,
            failure: None,
            delay: None,
        }
    }

    /// A provider that refuses access to every metric.
    pub fn denied() -> Self {
        Self {
            authorization: Authorization::Denied,
            ..Self::new()
        }
    }

    /// A provider whose queries always fail with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new()
        }
    }

    /// Delay every query by `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, sample: Sample) {
        self.samples
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(sample);
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BiometricProvider for MemoryProvider {
    async fn request_authorization(&self) -> Authorization {
        self.authorization
    }

    async fn samples(
        &self,
        metric: Metric,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Sample>, BiometricError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.authorization == Authorization::Denied {
            return Err(BiometricError::AuthorizationDenied {
                metric: metric.to_string(),
            });
        }
        if let Some(message) = &self.failure {
            return Err(BiometricError::QueryFailed {
                metric: metric.to_string(),
                message: message.clone(),
            });
        }
        let samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        Ok(samples
            .iter()
            .filter(|s| s.metric == metric && s.at >= from && s.at <= to)
            .cloned()
            .collect())
    }
}
