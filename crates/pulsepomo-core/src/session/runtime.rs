//! Serialized event loop around one [`SessionEngine`].
//!
//! The 1-second tick, user intents and host lifecycle signals all pass
//! through a single task, so engine transitions never interleave.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::timer::{SessionEngine, SessionSnapshot};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Inbound intents and host signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start { duration_seconds: u64 },
    Pause,
    Resume,
    TogglePause,
    Acknowledge,
    AcknowledgeAndRestart { duration_seconds: u64 },
    Suspend,
    ResumeForeground,
    Finish,
}

enum Message {
    Command(Command),
    Shutdown,
}

/// Handle to a running session loop.
pub struct SessionRuntime {
    commands: mpsc::Sender<Message>,
    events: broadcast::Sender<Event>,
    state: watch::Receiver<SessionSnapshot>,
    task: JoinHandle<SessionEngine>,
}

impl SessionRuntime {
    /// Move `engine` onto its own task. Events are published on `events`,
    /// which may be shared with a [`Finalizer`](super::Finalizer).
    pub fn spawn(engine: SessionEngine, events: broadcast::Sender<Event>) -> Self {
        let (commands, rx) = mpsc::channel(32);
        let (state_tx, state) = watch::channel(engine.snapshot());
        let task = tokio::spawn(run_loop(engine, rx, events.clone(), state_tx));
        Self {
            commands,
            events,
            state,
            task,
        }
    }

    pub async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(Message::Command(command))
            .await
            .map_err(|_| CoreError::Custom("session runtime has stopped".into()))
    }

    pub async fn start(&self, duration_seconds: u64) -> Result<()> {
        self.send(Command::Start { duration_seconds }).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(Command::Pause).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.send(Command::Resume).await
    }

    pub async fn finish(&self) -> Result<()> {
        self.send(Command::Finish).await
    }

    pub async fn acknowledge_and_restart(&self, duration_seconds: u64) -> Result<()> {
        self.send(Command::AcknowledgeAndRestart { duration_seconds })
            .await
    }

    pub async fn suspend(&self) -> Result<()> {
        self.send(Command::Suspend).await
    }

    pub async fn resume_foreground(&self) -> Result<()> {
        self.send(Command::ResumeForeground).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Latest published snapshot; updated after every handled message.
    pub fn state(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.clone()
    }

    /// Stop the loop and take the engine back.
    pub async fn shutdown(self) -> Result<SessionEngine> {
        // The loop may already be gone if every sender was dropped.
        let _ = self.commands.send(Message::Shutdown).await;
        self.task
            .await
            .map_err(|e| CoreError::Custom(format!("session runtime panicked: {e}")))
    }
}

fn apply(engine: &mut SessionEngine, command: Command) -> Vec<Event> {
    match command {
        Command::Start { duration_seconds } => engine.start(duration_seconds).into_iter().collect(),
        Command::Pause => engine.pause().into_iter().collect(),
        Command::Resume => engine.resume().into_iter().collect(),
        Command::TogglePause => engine.toggle_pause().into_iter().collect(),
        Command::Acknowledge => engine.acknowledge().into_iter().collect(),
        Command::AcknowledgeAndRestart { duration_seconds } => engine
            .acknowledge_and_restart(duration_seconds)
            .into_iter()
            .collect(),
        Command::Suspend => engine.suspend().into_iter().collect(),
        Command::ResumeForeground => engine.resume_foreground(),
        Command::Finish => engine.finish().into_iter().collect(),
    }
}

async fn run_loop(
    mut engine: SessionEngine,
    mut rx: mpsc::Receiver<Message>,
    events: broadcast::Sender<Event>,
    state: watch::Sender<SessionSnapshot>,
) -> SessionEngine {
    let mut interval = tokio::time::interval(TICK_PERIOD);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let out: Vec<Event> = tokio::select! {
            biased;
            message = rx.recv() => {
                let Some(Message::Command(command)) = message else {
                    break;
                };
                debug!(?command, "session command");
                let was_ticking = engine.is_ticking();
                let out = apply(&mut engine, command);
                if !was_ticking && engine.is_ticking() {
                    // First tick lands one full period after the start.
                    interval.reset();
                }
                out
            }
            _ = interval.tick(), if engine.is_ticking() => {
                engine.tick().into_iter().collect()
            }
        };

        for event in out {
            let _ = events.send(event);
        }
        state.send_replace(engine.snapshot());
    }
    engine
}
