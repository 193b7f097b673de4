//! The per-message handler and its worker loop.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;

use bt_core::{Clock, LocationEvent};
use bt_spatial::GridSpec;
use bt_transport::{Publisher, RetryPolicy, Subscriber};

use crate::{MemoryStore, PositionStore, ProcessorError, ProcessorStats};

/// What [`StreamProcessor::handle`] did with one message.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Parsed and run through every step.  Failures are counted, not fatal.
    Processed {
        store_errors: u8,
        republished:  bool,
    },
    /// Not a valid LocationEvent.
    Dropped,
}

/// Applies each delivered LocationEvent to the stores and republishes it.
///
/// Share it behind an `Arc` to drive several workers: every store write is a
/// single-key atomic mutation.
pub struct StreamProcessor<S: PositionStore, P: Publisher, C: Clock> {
    store:        Arc<S>,
    publisher:    Arc<P>,
    clock:        C,
    grid:         GridSpec,
    events_topic: Arc<str>,
    stats:        Arc<ProcessorStats>,
}

impl<S: PositionStore, P: Publisher, C: Clock> StreamProcessor<S, P, C> {
    pub fn new(store: Arc<S>, publisher: Arc<P>, clock: C, grid: GridSpec, events_topic: &str) -> Self {
        Self {
            store,
            publisher,
            clock,
            grid,
            events_topic: Arc::from(events_topic),
            stats: Arc::new(ProcessorStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<ProcessorStats> {
        Arc::clone(&self.stats)
    }

    /// Run every step for one message payload.
    pub async fn handle(&self, payload: &[u8]) -> Outcome {
        let event = match LocationEvent::from_json(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!("{}", ProcessorError::Malformed(e.to_string()));
                self.stats.dropped();
                return Outcome::Dropped;
            }
        };

        let position = event.position();
        let now_ms = self.clock.now_ms();
        let results = [
            self.store.upsert_latest(&event),
            self.store.upsert_position(&event.vehicle_id, position),
            self.store.increment_density(self.grid.cell(position), now_ms).map(|_| ()),
        ];
        let mut store_errors = 0;
        for e in results.into_iter().filter_map(Result::err) {
            warn!("{} ({})", ProcessorError::from(e), event.vehicle_id);
            self.stats.store_error();
            store_errors += 1;
        }
        self.stats.processed();

        let republished = match self
            .publisher
            .publish(&self.events_topic, event.vehicle_id.as_str(), event.to_json())
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!("{} ({})", ProcessorError::from(e), event.vehicle_id);
                self.stats.republish_error();
                false
            }
        };

        Outcome::Processed { store_errors, republished }
    }

    /// Pull, handle and acknowledge messages until `shutdown` turns `true`.
    ///
    /// A message already received is always finished and acknowledged
    /// before the shutdown flag is looked at again.  Transport errors back
    /// off under `retry` and never end the loop.  Returns the number of
    /// messages handled.
    pub async fn run<Sub: Subscriber>(
        &self,
        mut subscriber: Sub,
        mut shutdown:   watch::Receiver<bool>,
        retry:          RetryPolicy,
    ) -> u64 {
        let mut handled = 0u64;
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
                    let outcome = self.handle(&delivery.payload).await;
                    debug!("{}/{}@{}: {outcome:?}", delivery.topic, delivery.partition, delivery.offset);
                    if let Err(e) = subscriber.ack(&delivery) {
                        warn!(
                            "ack of {}/{}@{} failed, expect redelivery: {e}",
                            delivery.topic, delivery.partition, delivery.offset
                        );
                    }
                    handled += 1;
                }
                Err(e) => {
                    let delay = retry.backoff(failures.min(retry.max_retries));
                    failures = failures.saturating_add(1);
                    warn!("subscription error: {e}; retrying in {delay:?}");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.changed() => {}
                    }
                }
            }
        }

        info!("processor worker stopped after {handled} messages");
        handled
    }
}

/// Remove expired density cells every `every` until `shutdown` turns `true`.
pub async fn run_density_sweep<C: Clock>(
    store:        Arc<MemoryStore>,
    clock:        C,
    every:        Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    while !*shutdown.borrow() {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = interval.tick() => {
                let removed = store.density().sweep(clock.now_ms());
                if removed > 0 {
                    debug!("density sweep removed {removed} expired cells");
                }
            }
        }
    }
}
