use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{FocusSummary, SessionRecord};

/// Every state change in the system produces an Event.
/// Front ends subscribe to them; nothing in the core reacts to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A countdown cycle began (first start or restart after elapse).
    CycleStarted {
        cycle: u32,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    Tick {
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    Paused {
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    Resumed {
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    /// The countdown reached zero.
    Elapsed {
        cycles: u32,
        total_focused_seconds: u64,
        at: DateTime<Utc>,
    },
    /// The elapsed alert was dismissed without starting another cycle.
    Acknowledged {
        at: DateTime<Utc>,
    },
    /// The host moved the app to the background.
    Suspended {
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    /// The host brought the app back; `drift_secs` were deducted.
    ForegroundResumed {
        drift_secs: u64,
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    /// The user ended the focus session; finalization is under way.
    Finished {
        summary: FocusSummary,
        at: DateTime<Utc>,
    },
    SessionFinalized {
        record: SessionRecord,
    },
    FinalizationFailed {
        message: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Snake-case name of the variant, for logs and terse output.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::CycleStarted { .. } => "cycle_started",
            Event::Tick { .. } => "tick",
            Event::Paused { .. } => "paused",
            Event::Resumed { .. } => "resumed",
            Event::Elapsed { .. } => "elapsed",
            Event::Acknowledged { .. } => "acknowledged",
            Event::Suspended { .. } => "suspended",
            Event::ForegroundResumed { .. } => "foreground_resumed",
            Event::Finished { .. } => "finished",
            Event::SessionFinalized { .. } => "session_finalized",
            Event::FinalizationFailed { .. } => "finalization_failed",
        }
    }
}
