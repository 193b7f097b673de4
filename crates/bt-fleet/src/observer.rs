//! Fleet observer trait for progress reporting.

use log::{debug, info};

use bt_core::{LocationEvent, Tick, VehicleId};
use bt_transport::TransportError;

/// Callbacks invoked by [`FleetDriver::run`][crate::FleetDriver::run].
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
pub trait FleetObserver: Send {
    /// Called at the very start of each tick, before any vehicle moves.
    fn on_tick_start(&mut self, _tick: Tick) {}

    /// Called after the tick's events have been handed to publish tasks.
    fn on_tick_end(&mut self, _tick: Tick, _events: &[LocationEvent]) {}

    /// Called when a publish task reports failure.  Arrives asynchronously,
    /// usually during a later tick.
    fn on_publish_error(&mut self, _vehicle: &VehicleId, _error: &TransportError) {}

    /// Called once when the driver stops; `ticks` is the number of ticks run.
    fn on_stop(&mut self, _ticks: u64) {}
}

/// A [`FleetObserver`] that does nothing.
pub struct NoopObserver;

impl FleetObserver for NoopObserver {}

/// Logs a progress line every `every` ticks and a summary on stop.
pub struct LogObserver {
    pub every:      u64,
    publish_errors: u64,
}

impl LogObserver {
    pub fn new(every: u64) -> Self {
        Self { every: every.max(1), publish_errors: 0 }
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::new(60)
    }
}

impl FleetObserver for LogObserver {
    fn on_tick_end(&mut self, tick: Tick, events: &[LocationEvent]) {
        if tick.0.is_multiple_of(self.every) {
            info!("{tick}: {} events, {} publish errors so far", events.len(), self.publish_errors);
        } else {
            debug!("{tick}: {} events", events.len());
        }
    }

    fn on_publish_error(&mut self, _vehicle: &VehicleId, _error: &TransportError) {
        self.publish_errors += 1;
    }

    fn on_stop(&mut self, ticks: u64) {
        info!("simulator stopped after {ticks} ticks ({} publish errors)", self.publish_errors);
    }
}
