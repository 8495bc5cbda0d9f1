//! Biometric sampling and classification.
//!
//! A [`BiometricProvider`] hands out raw samples; the [`BiometricAggregator`]
//! turns a trailing window of them into one averaged reading.

mod aggregator;
mod provider;
mod sample_log;

pub use aggregator::BiometricAggregator;
pub use provider::MemoryProvider;
pub use sample_log::SampleLog;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BiometricError;

/// Resting heart rate bounds (bpm, exclusive).
pub const HEART_RATE_NORMAL_MIN: u32 = 50;
pub const HEART_RATE_NORMAL_MAX: u32 = 100;

/// Respiratory rate bounds (breaths/min, exclusive).
pub const RESPIRATORY_RATE_NORMAL_MIN: u32 = 10;
pub const RESPIRATORY_RATE_NORMAL_MAX: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    HeartRate,
    RespiratoryRate,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::HeartRate => "heart_rate",
            Metric::RespiratoryRate => "respiratory_rate",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::HeartRate => "bpm",
            Metric::RespiratoryRate => "breaths/min",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "heart_rate" | "hr" => Ok(Metric::HeartRate),
            "respiratory_rate" | "rr" | "breath" => Ok(Metric::RespiratoryRate),
            other => Err(format!("unknown metric: {other}")),
        }
    }
}

/// One physiological reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub metric: Metric,
    pub value: f64,
    pub at: DateTime<Utc>,
}

impl Sample {
    pub fn new(metric: Metric, value: f64, at: DateTime<Utc>) -> Self {
        Self { metric, value, at }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Authorization {
    Granted,
    Denied,
}

/// Source of physiological samples (a wearable's health store, a local log).
#[async_trait]
pub trait BiometricProvider: Send + Sync {
    /// Ask for read access to both metrics.
    async fn request_authorization(&self) -> Authorization;

    /// All samples of `metric` taken within `[from, to]`.
    async fn samples(
        &self,
        metric: Metric,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Sample>, BiometricError>;
}

pub fn classify_heart_rate(bpm: u32) -> bool {
    bpm > HEART_RATE_NORMAL_MIN && bpm < HEART_RATE_NORMAL_MAX
}

pub fn classify_respiratory_rate(breaths_per_minute: u32) -> bool {
    breaths_per_minute > RESPIRATORY_RATE_NORMAL_MIN
        && breaths_per_minute < RESPIRATORY_RATE_NORMAL_MAX
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heart_rate_bounds_are_strict() {
        assert!(!classify_heart_rate(50));
        assert!(classify_heart_rate(51));
        assert!(classify_heart_rate(99));
        assert!(!classify_heart_rate(100));
        assert!(!classify_heart_rate(0));
    }

    #[test]
    fn respiratory_rate_bounds_are_strict() {
        assert!(!classify_respiratory_rate(10));
        assert!(classify_respiratory_rate(11));
        assert!(classify_respiratory_rate(24));
        assert!(!classify_respiratory_rate(25));
    }

    #[test]
    fn metric_parses_cli_spellings() {
        assert_eq!("heart-rate".parse::<Metric>().unwrap(), Metric::HeartRate);
        assert_eq!("HR".parse::<Metric>().unwrap(), Metric::HeartRate);
        assert_eq!(
            "respiratory_rate".parse::<Metric>().unwrap(),
            Metric::RespiratoryRate
        );
        assert!("pulse".parse::<Metric>().is_err());
    }
}
