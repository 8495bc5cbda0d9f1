use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use tracing::{debug, info, warn};

use super::{Authorization, BiometricProvider, Metric, Sample};
use crate::clock::Clock;
use crate::error::BiometricError;

/// Averages provider samples over a trailing window.
#[derive(Clone)]
pub struct BiometricAggregator {
    provider: Arc<dyn BiometricProvider>,
    clock: Arc<dyn Clock>,
    /// Unset means a stalled provider stalls the caller indefinitely.
    timeout: Option<Duration>,
}

impl BiometricAggregator {
    pub fn new(provider: Arc<dyn BiometricProvider>, clock: Arc<dyn Clock>) -> Self {
        Self {
            provider,
            clock,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fire the provider's authorization request and log the answer.
    pub async fn request_authorization(&self) -> Authorization {
        let answer = self.provider.request_authorization().await;
        match answer {
            Authorization::Granted => info!("biometric authorization granted"),
            Authorization::Denied => warn!("biometric authorization denied"),
        }
        answer
    }

    /// Mean of `metric` over the last `window_seconds`, truncated toward zero.
    ///
    /// `Ok(None)` means the window held no samples.
    pub async fn try_average_over_window(
        &self,
        metric: Metric,
        window_seconds: u64,
    ) -> Result<Option<u32>, BiometricError> {
        if window_seconds == 0 {
            return Ok(None);
        }
        let to = self.clock.now();
        let from = to - ChronoDuration::seconds(window_seconds.min(u64::from(u32::MAX)) as i64);

        let query = self.provider.samples(metric, from, to);
        let samples = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, query).await.map_err(|_| {
                BiometricError::Timeout {
                    metric: metric.to_string(),
                    timeout_secs: limit.as_secs(),
                }
            })??,
            None => query.await?,
        };

        let in_window: Vec<Sample> = samples
            .into_iter()
            .filter(|s| s.metric == metric && s.at >= from && s.at <= to)
            .collect();
        debug!(%metric, window_seconds, count = in_window.len(), "biometric samples fetched");
        Ok(average(&in_window))
    }

    /// Like [`try_average_over_window`](Self::try_average_over_window), but
    /// every failure collapses to `None` after being logged.
    pub async fn average_over_window(&self, metric: Metric, window_seconds: u64) -> Option<u32> {
        match self.try_average_over_window(metric, window_seconds).await {
            Ok(Some(avg)) => {
                info!(%metric, window_seconds, avg, "{} averaged", metric.unit());
                Some(avg)
            }
            Ok(None) => {
                warn!(%metric, window_seconds, "no samples in window");
                None
            }
            Err(e) => {
                warn!(%metric, window_seconds, error = %e, "biometric reading unavailable");
                None
            }
        }
    }
}

/// Sum of truncated sample values divided by the sample count.
pub(crate) fn average(samples: &[Sample]) -> Option<u32> {
    if samples.is_empty() {
        return None;
    }
    let sum: u64 = samples.iter().map(|s| s.value.trunc() as u64).sum();
    Some((sum / samples.len() as u64) as u32)
}
