use tracing::info;

/// Device-level notification fired when a countdown reaches zero.
///
/// Called synchronously from the engine; implementations must not block.
pub trait DeviceAlert: Send + Sync {
    fn timer_elapsed(&self);
}

/// Writes the alert to the log. Used where no haptic hardware is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlert;

impl DeviceAlert for LogAlert {
    fn timer_elapsed(&self) {
        info!("time's up: focus cycle elapsed");
    }
}
