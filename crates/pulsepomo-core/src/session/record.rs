use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::biometrics::{classify_heart_rate, classify_respiratory_rate};

/// Totals accumulated by the engine when the user ends a focus session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusSummary {
    pub start_date: DateTime<Utc>,
    pub cycles: u32,
    pub total_focused_seconds: u64,
}

/// A completed focus session as persisted in the history.
///
/// Field names are serialized in camelCase so stored histories stay readable
/// by other clients of the same blob list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: Uuid,
    pub heart_rate: u32,
    pub respiratory_rate: u32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub duration_seconds: u64,
    pub is_heart_rate_normal: bool,
    pub is_respiration_rate_normal: bool,
    pub is_completed: bool,
}

impl SessionRecord {
    /// Build the record for a finished session, classifying both rates.
    pub fn from_summary(
        summary: &FocusSummary,
        heart_rate: u32,
        respiratory_rate: u32,
        end_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            heart_rate,
            respiratory_rate,
            start_date: summary.start_date,
            end_date,
            duration_seconds: summary.total_focused_seconds,
            is_heart_rate_normal: classify_heart_rate(heart_rate),
            is_respiration_rate_normal: classify_respiratory_rate(respiratory_rate),
            is_completed: true,
        }
    }

    /// Whether any biometric data was captured for this session.
    pub fn has_biometrics(&self) -> bool {
        self.heart_rate > 0 || self.respiratory_rate > 0
    }
}
