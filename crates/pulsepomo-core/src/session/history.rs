//! Read-side helpers over the stored session history.

use serde::{Deserialize, Serialize};

use super::SessionRecord;

/// Records ordered for display: most recent `end_date` first.
pub fn newest_first(mut records: Vec<SessionRecord>) -> Vec<SessionRecord> {
    records.sort_by(|a, b| b.end_date.cmp(&a.end_date));
    records
}

/// Aggregate figures over a history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub total_sessions: usize,
    pub total_focused_seconds: u64,
    /// Averages only include sessions where the reading was captured.
    pub average_heart_rate: Option<u32>,
    pub average_respiratory_rate: Option<u32>,
    pub abnormal_heart_rate_sessions: usize,
    pub abnormal_respiration_sessions: usize,
}

impl HistorySummary {
    pub fn from_records(records: &[SessionRecord]) -> Self {
        let mean = |values: Vec<u32>| -> Option<u32> {
            if values.is_empty() {
                return None;
            }
            let sum: u64 = values.iter().map(|v| u64::from(*v)).sum();
            Some((sum / values.len() as u64) as u32)
        };

        Self {
            total_sessions: records.len(),
            total_focused_seconds: records.iter().map(|r| r.duration_seconds).sum(),
            average_heart_rate: mean(
                records
                    .iter()
                    .map(|r| r.heart_rate)
                    .filter(|v| *v > 0)
                    .collect(),
            ),
            average_respiratory_rate: mean(
                records
                    .iter()
                    .map(|r| r.respiratory_rate)
                    .filter(|v| *v > 0)
                    .collect(),
            ),
            abnormal_heart_rate_sessions: records
                .iter()
                .filter(|r| r.heart_rate > 0 && !r.is_heart_rate_normal)
                .count(),
            abnormal_respiration_sessions: records
                .iter()
                .filter(|r| r.respiratory_rate > 0 && !r.is_respiration_rate_normal)
                .count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FocusSummary;
    use chrono::{Duration, Utc};

    fn record(hr: u32, rr: u32, secs: u64, ended_ago_min: i64) -> SessionRecord {
        let now = Utc::now();
        let summary = FocusSummary {
            start_date: now - Duration::minutes(ended_ago_min + 30),
            cycles: 1,
            total_focused_seconds: secs,
        };
        SessionRecord::from_summary(&summary, hr, rr, now - Duration::minutes(ended_ago_min))
    }

    #[test]
    fn newest_first_sorts_by_end_date_descending() {
        let old = record(70, 14, 60, 120);
        let new = record(70, 14, 60, 5);
        let mid = record(70, 14, 60, 60);
        let sorted = newest_first(vec![old.clone(), new.clone(), mid.clone()]);
        assert_eq!(sorted, vec![new, mid, old]);
    }

    #[test]
    fn summary_skips_missing_readings() {
        let records = vec![
            record(60, 12, 300, 10),
            record(0, 0, 600, 20),
            record(110, 30, 900, 30),
        ];
        let summary = HistorySummary::from_records(&records);
        assert_eq!(summary.total_sessions, 3);
        assert_eq!(summary.total_focused_seconds, 1800);
        assert_eq!(summary.average_heart_rate, Some(85));
        assert_eq!(summary.average_respiratory_rate, Some(21));
        assert_eq!(summary.abnormal_heart_rate_sessions, 1);
        assert_eq!(summary.abnormal_respiration_sessions, 1);
    }

    #[test]
    fn empty_history_summary() {
        assert_eq!(HistorySummary::from_records(&[]), HistorySummary::default());
    }
}
