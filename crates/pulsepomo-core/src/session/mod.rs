mod finalizer;
pub mod history;
mod record;
mod runtime;

pub use finalizer::{Finalize, Finalizer};
pub use history::{newest_first, HistorySummary};
pub use record::{FocusSummary, SessionRecord};
pub use runtime::{Command, SessionRuntime, TICK_PERIOD};
