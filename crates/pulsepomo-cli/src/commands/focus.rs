use std::io::Write;
use std::sync::Arc;

use clap::Args;
use pulsepomo_core::biometrics::SampleLog;
use pulsepomo_core::session::{Command, Finalizer};
use pulsepomo_core::timer::{format_mm_ss, DeviceAlert};
use pulsepomo_core::{
    BiometricAggregator, Clock, Config, Event, SessionEngine, SessionRuntime, SystemClock,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use super::open_store;

#[derive(Args)]
pub struct FocusArgs {
    /// Focus length in minutes (defaults to timer.focus_minutes)
    #[arg(long, short)]
    minutes: Option<u32>,
    /// Focus length in seconds, for short trial runs
    #[arg(long, conflicts_with = "minutes")]
    seconds: Option<u64>,
    /// Use the Nth entry of timer.presets_minutes
    #[arg(long, conflicts_with_all = ["minutes", "seconds"])]
    preset: Option<usize>,
    /// Run this many cycles back to back, then finish without input
    #[arg(long)]
    cycles: Option<u32>,
    /// Emit events as JSON lines instead of the countdown display
    #[arg(long)]
    json: bool,
}

/// Rings the terminal bell when a countdown reaches zero.
struct TerminalBell;

impl DeviceAlert for TerminalBell {
    fn timer_elapsed(&self) {
        let mut err = std::io::stderr();
        let _ = err.write_all(b"\x07");
        let _ = err.flush();
    }
}

const HELP: &str = "keys: p pause/resume | s suspend | b back to foreground | r another cycle | f finish";

pub fn run(args: FocusArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let duration = match (args.seconds, args.preset, args.minutes) {
        (Some(0), _, _) => return Err("focus length must be at least one second".into()),
        (Some(secs), _, _) => secs,
        (None, Some(number), _) => config.timer.preset_seconds(number)?,
        (None, None, minutes) => config
            .timer
            .focus_seconds(minutes.unwrap_or(config.timer.focus_minutes))?,
    };
    if args.cycles == Some(0) {
        return Err("--cycles must be at least 1".into());
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(focus_session(config, duration, args.cycles, args.json))
}

async fn focus_session(
    config: Config,
    duration: u64,
    target_cycles: Option<u32>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (db, store) = open_store(&config)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let aggregator = if config.biometrics.enabled {
        let aggregator = BiometricAggregator::new(Arc::new(SampleLog::new(db)), clock.clone())
            .with_timeout(config.biometrics.request_timeout());
        let auth = aggregator.clone();
        tokio::spawn(async move {
            auth.request_authorization().await;
        });
        Some(aggregator)
    } else {
        None
    };

    let (events_tx, mut events) = broadcast::channel(256);
    let finalizer = Finalizer::new(
        aggregator,
        Arc::new(store),
        clock.clone(),
        tokio::runtime::Handle::current(),
    )
    .with_events(events_tx.clone());
    let engine = SessionEngine::new(clock, Arc::new(TerminalBell), Arc::new(finalizer));
    let runtime = SessionRuntime::spawn(engine, events_tx);

    runtime.start(duration).await?;
    if !json {
        eprintln!("{HELP}");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut outcome: Result<(), Box<dyn std::error::Error>> = Ok(());

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                match line? {
                    None => {
                        stdin_open = false;
                        // Unattended runs keep going until their cycle target.
                        if target_cycles.is_none() {
                            runtime.finish().await?;
                        }
                    }
                    Some(input) => match input.trim() {
                        "p" => runtime.send(Command::TogglePause).await?,
                        "s" => runtime.suspend().await?,
                        "b" => runtime.resume_foreground().await?,
                        "r" => runtime.acknowledge_and_restart(duration).await?,
                        "f" | "q" => runtime.finish().await?,
                        "" => {}
                        other => eprintln!("unknown key '{other}'; {HELP}"),
                    },
                }
            }
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "event display fell behind");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                render(&event, json)?;
                match &event {
                    Event::Elapsed { cycles, .. } => {
                        if let Some(target) = target_cycles {
                            if *cycles < target {
                                runtime.acknowledge_and_restart(duration).await?;
                            } else {
                                runtime.finish().await?;
                            }
                        }
                    }
                    Event::SessionFinalized { .. } => break,
                    Event::FinalizationFailed { message, .. } => {
                        outcome = Err(format!("session was not saved: {message}").into());
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    runtime.shutdown().await?;
    outcome
}

fn render(event: &Event, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    let mut out = std::io::stdout();
    match event {
        Event::CycleStarted {
            cycle,
            duration_secs,
            ..
        } => println!("Cycle {cycle}: {} of focus", format_mm_ss(*duration_secs)),
        Event::Tick {
            remaining_seconds, ..
        } => {
            print!("\r{}   ", format_mm_ss(*remaining_seconds));
            out.flush()?;
        }
        Event::Paused {
            remaining_seconds, ..
        } => {
            print!("\r{} (paused)", format_mm_ss(*remaining_seconds));
            out.flush()?;
        }
        Event::Resumed { .. } | Event::Suspended { .. } => {}
        Event::ForegroundResumed { drift_secs, .. } if *drift_secs > 0 => {
            println!("\rwelcome back, {drift_secs}s passed in the background");
        }
        Event::ForegroundResumed { .. } => {}
        Event::Elapsed { .. } => {
            println!("\r00:00");
            println!("Time's Up! Now you can take a moment to relax.");
        }
        Event::Acknowledged { .. } => {}
        Event::Finished { summary, .. } => {
            println!(
                "\nTime focused: {} in {} cycles",
                format_mm_ss(summary.total_focused_seconds),
                summary.cycles
            );
        }
        Event::SessionFinalized { record } => {
            println!("Average HR:      {} bpm", record.heart_rate);
            println!("Average breaths: {} per minute", record.respiratory_rate);
            println!("Session saved ({})", record.id.simple());
        }
        Event::FinalizationFailed { message, .. } => {
            eprintln!("could not save session: {message}");
        }
    }
    Ok(())
}
