use chrono::Utc;
use clap::Subcommand;
use pulsepomo_core::session::newest_first;
use pulsepomo_core::timer::{format_mm_ss, format_relative};
use pulsepomo_core::{Config, HistorySummary};

use super::open_store;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List finished sessions, most recent first
    List {
        /// Show at most this many sessions
        #[arg(long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Totals and biometric averages over the whole history
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn flag(normal: bool, value: u32) -> &'static str {
    match (value, normal) {
        (0, _) => "n/a",
        (_, true) => "normal",
        (_, false) => "abnormal",
    }
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let (_db, store) = open_store(&config)?;
    let records = store.load_all()?;

    match action {
        HistoryAction::List { limit, json } => {
            let mut records = newest_first(records);
            if let Some(limit) = limit {
                records.truncate(limit);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }
            if records.is_empty() {
                println!("No sessions yet.");
                return Ok(());
            }
            let now = Utc::now();
            for r in &records {
                if !r.has_biometrics() {
                    println!(
                        "{}  {:>8}  no biometrics recorded  {}",
                        r.id.simple(),
                        format_mm_ss(r.duration_seconds),
                        format_relative(r.end_date, now),
                    );
                    continue;
                }
                println!(
                    "{}  {:>8}  HR {:>3} bpm ({})  RR {:>2}/min ({})  {}",
                    r.id.simple(),
                    format_mm_ss(r.duration_seconds),
                    r.heart_rate,
                    flag(r.is_heart_rate_normal, r.heart_rate),
                    r.respiratory_rate,
                    flag(r.is_respiration_rate_normal, r.respiratory_rate),
                    format_relative(r.end_date, now),
                );
            }
        }
        HistoryAction::Stats { json } => {
            let summary = HistorySummary::from_records(&records);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }
            let or_na = |v: Option<u32>| v.map(|v| v.to_string()).unwrap_or_else(|| "n/a".into());
            println!("Sessions:         {}", summary.total_sessions);
            println!("Time focused:     {}", format_mm_ss(summary.total_focused_seconds));
            println!("Average HR:       {} bpm", or_na(summary.average_heart_rate));
            println!("Average breaths:  {} per minute", or_na(summary.average_respiratory_rate));
            println!("Abnormal HR:      {}", summary.abnormal_heart_rate_sessions);
            println!("Abnormal breaths: {}", summary.abnormal_respiration_sessions);
        }
    }
    Ok(())
}
