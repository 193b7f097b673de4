//! Broadcast hub shared by the bridge and every observer session.

use std::sync::Arc;

use tokio::sync::broadcast;

use bt_core::LocationEvent;

/// Events each observer may fall behind by before it starts skipping.
pub const DEFAULT_CAPACITY: usize = 1_024;

/// Cloneable handle onto one broadcast channel.
#[derive(Clone)]
pub struct FanoutHub {
    tx: broadcast::Sender<Arc<LocationEvent>>,
}

impl Default for FanoutHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl FanoutHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// A receiver that sees every event broadcast from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<LocationEvent>> {
        self.tx.subscribe()
    }

    /// Hand `event` to every current observer; returns how many there were.
    ///
    /// Never blocks.  With no observers the event is simply discarded.
    pub fn broadcast(&self, event: LocationEvent) -> usize {
        self.tx.send(Arc::new(event)).unwrap_or(0)
    }

    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
