//! End-of-session finalization: biometrics, classification, persistence.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::{self, JoinHandle};
use tracing::{error, info};

use super::{FocusSummary, SessionRecord};
use crate::biometrics::{BiometricAggregator, Metric};
use crate::clock::Clock;
use crate::error::StoreError;
use crate::events::Event;
use crate::storage::SessionStore;

/// Receives the totals of a finished session.
///
/// Called from inside the engine, so implementations must return promptly
/// and never report failure back into the timer path.
pub trait Finalize: Send + Sync {
    fn finalize(&self, summary: FocusSummary);
}

/// Production finalizer: samples both metrics concurrently, builds the
/// record and appends it to the session store on a background task.
#[derive(Clone)]
pub struct Finalizer {
    aggregator: Option<BiometricAggregator>,
    store: Arc<SessionStore>,
    clock: Arc<dyn Clock>,
    events: Option<broadcast::Sender<Event>>,
    handle: Handle,
}

impl Finalizer {
    /// `aggregator` may be `None` when biometric sampling is disabled; both
    /// rates are then recorded as 0.
    pub fn new(
        aggregator: Option<BiometricAggregator>,
        store: Arc<SessionStore>,
        clock: Arc<dyn Clock>,
        handle: Handle,
    ) -> Self {
        Self {
            aggregator,
            store,
            clock,
            events: None,
            handle,
        }
    }

    /// Publish `SessionFinalized` / `FinalizationFailed` on `events`.
    pub fn with_events(mut self, events: broadcast::Sender<Event>) -> Self {
        self.events = Some(events);
        self
    }

    /// Run finalization to completion.
    ///
    /// The two biometric reads are joined, not raced: whichever finishes
    /// first waits for the other. Missing readings become 0. The append runs
    /// on the blocking pool so a slow store never stalls the session loop.
    pub async fn run(&self, summary: FocusSummary) -> Result<SessionRecord, StoreError> {
        let window = summary.total_focused_seconds;
        let (heart_rate, respiratory_rate) = match &self.aggregator {
            Some(aggregator) => tokio::join!(
                aggregator.average_over_window(Metric::HeartRate, window),
                aggregator.average_over_window(Metric::RespiratoryRate, window),
            ),
            None => (None, None),
        };

        let record = SessionRecord::from_summary(
            &summary,
            heart_rate.unwrap_or(0),
            respiratory_rate.unwrap_or(0),
            self.clock.now(),
        );
        let store = Arc::clone(&self.store);
        let stored = record.clone();
        task::spawn_blocking(move || store.append(&stored))
            .await
            .map_err(|e| StoreError::WriteFailed(format!("append task failed: {e}")))??;
        Ok(record)
    }

    /// Start finalization on the runtime and return its handle.
    pub fn spawn(&self, summary: FocusSummary) -> JoinHandle<Option<SessionRecord>> {
        let this = self.clone();
        self.handle.spawn(async move {
            match this.run(summary).await {
                Ok(record) => {
                    info!(
                        id = %record.id,
                        heart_rate = record.heart_rate,
                        respiratory_rate = record.respiratory_rate,
                        "session finalized"
                    );
                    this.publish(Event::SessionFinalized {
                        record: record.clone(),
                    });
                    Some(record)
                }
                Err(e) => {
                    error!(error = %e, "session finalization failed");
                    this.publish(Event::FinalizationFailed {
                        message: e.to_string(),
                        at: this.clock.now(),
                    });
                    None
                }
            }
        })
    }

    fn publish(&self, event: Event) {
        if let Some(events) = &self.events {
            // No subscribers is fine.
            let _ = events.send(event);
        }
    }
}

impl Finalize for Finalizer {
    fn finalize(&self, summary: FocusSummary) {
        drop(self.spawn(summary));
    }
}
