mod alert;
mod engine;
mod format;

pub use alert::{DeviceAlert, LogAlert};
pub use engine::{SessionConfig, SessionEngine, SessionSnapshot, SessionState, TimerState};
pub use format::{format_mm_ss, format_relative};
