//! Subscription to the processed-event topic, forwarded into the hub.

use log::{debug, info, warn};
use tokio::sync::watch;

use bt_core::LocationEvent;
use bt_transport::{RetryPolicy, Subscriber};

use crate::FanoutHub;

/// Forwards every message of one subscription to a [`FanoutHub`].
pub struct FanoutBridge {
    hub:   FanoutHub,
    retry: RetryPolicy,
}

impl FanoutBridge {
    pub fn new(hub: FanoutHub, retry: RetryPolicy) -> Self {
        Self { hub, retry }
    }

    /// Run until `shutdown` turns `true`; returns the number of events
    /// broadcast.
    pub async fn run<S: Subscriber>(&self, mut subscriber: S, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut broadcast = 0u64;
        let mut failures = 0u32;

        while !*shutdown.borrow() {
            let next = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                next = subscriber.next() => next,
            };

            match next {
                Ok(delivery) => {
                    failures = 0;
                    match LocationEvent::from_json(&delivery.payload) {
                        Ok(event) => {
                            let observers = self.hub.broadcast(event);
                            debug!("event {}@{} sent to {observers} observers", delivery.partition, delivery.offset);
                            broadcast += 1;
                        }
                        Err(e) => warn!("dropping malformed fan-out message: {e}"),
                    }
                    if let Err(e) = subscriber.ack(&delivery) {
                        warn!("fan-out ack failed: {e}");
                    }
                }
                Err(e) => {
                    let delay = self.retry.backoff(failures.min(self.retry.max_retries));
                    failures = failures.saturating_add(1);
                    warn!("fan-out subscription error: {e}; retrying in {delay:?}");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.changed() => {}
                    }
                }
            }
        }

        info!("fan-out bridge stopped after {broadcast} events");
        broadcast
    }
}
