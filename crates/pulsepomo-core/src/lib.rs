//! # PulsePomo Core Library
//!
//! Core logic of the PulsePomo focus timer: a countdown engine that also
//! samples the wearer's heart rate and respiratory rate and keeps a history
//! of finished focus sessions.
//!
//! ## Architecture
//!
//! - **Session Engine**: a tick-driven state machine; the caller delivers one
//!   `tick()` per second and forwards host suspend/resume signals
//! - **Biometrics**: averaged readings over a trailing window, classified as
//!   normal or abnormal
//! - **Storage**: append-only session history over a key-value blob store,
//!   SQLite persistence and TOML configuration
//! - **Runtime**: a single tokio task that serializes ticks, intents and host
//!   signals, and finalizes sessions in the background
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: countdown/pause/cycle state machine
//! - [`BiometricAggregator`]: sample averaging and classification
//! - [`SessionStore`]: history persistence
//! - [`SessionRuntime`]: event loop and observation channels

pub mod biometrics;
pub mod clock;
pub mod error;
pub mod events;
pub mod session;
pub mod storage;
pub mod timer;

pub use biometrics::{BiometricAggregator, BiometricProvider, Metric, Sample};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{BiometricError, ConfigError, CoreError, StoreError};
pub use events::Event;
pub use session::{Finalizer, FocusSummary, HistorySummary, SessionRecord, SessionRuntime};
pub use storage::{BlobStore, Config, Database, SessionStore};
pub use timer::{SessionEngine, SessionState, TimerState};
