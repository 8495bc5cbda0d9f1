use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Subcommand;
use pulsepomo_core::biometrics::SampleLog;
use pulsepomo_core::{Database, Metric, Sample};

#[derive(Subcommand)]
pub enum SamplesAction {
    /// Record one reading
    Add {
        /// heart-rate | respiratory-rate
        #[arg(long)]
        metric: Metric,
        /// Reading value (bpm or breaths per minute)
        #[arg(long)]
        value: f64,
        /// RFC 3339 timestamp; defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Show the most recent readings
    List {
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: SamplesAction) -> Result<(), Box<dyn std::error::Error>> {
    let log = SampleLog::new(Arc::new(Database::open()?));

    match action {
        SamplesAction::Add { metric, value, at } => {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("invalid reading: {value}").into());
            }
            let sample = Sample::new(metric, value, at.unwrap_or_else(Utc::now));
            log.record(&sample)?;
            println!("recorded {} {} {}", metric, value, metric.unit());
        }
        SamplesAction::List { limit, json } => {
            let samples = log.recent(limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&samples)?);
            } else {
                for s in &samples {
                    println!("{}  {:<16} {:>6.1} {}", s.at.to_rfc3339(), s.metric, s.value, s.metric.unit());
                }
            }
        }
    }
    Ok(())
}
