//! Async tick driver: fixed-interval ticks, fire-and-forget publishing.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore};
use tokio::time::MissedTickBehavior;

use bt_core::{Clock, LocationEvent, Tick, VehicleId};
use bt_transport::{Publisher, TransportError};

use crate::{Fleet, FleetObserver};

/// Publishes allowed in flight at once before new events are dropped.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4_096;

/// Drives a [`Fleet`] on a wall-clock interval and publishes its events.
///
/// The publisher is a handle supplied by the caller; the driver never opens
/// or closes transport connections itself.
///
/// At most `max_in_flight` publishes run at once.  While that many are
/// pending (a long broker outage under retry), further events are dropped
/// and reported as publish errors instead of piling up.
pub struct FleetDriver<P: Publisher, C: Clock> {
    publisher:     Arc<P>,
    clock:         C,
    topic:         Arc<str>,
    tick_interval: Duration,
    in_flight:     Arc<Semaphore>,
}

impl<P: Publisher, C: Clock> FleetDriver<P, C> {
    pub fn new(publisher: Arc<P>, clock: C, topic: &str, tick_interval: Duration) -> Self {
        Self {
            publisher,
            clock,
            topic: Arc::from(topic),
            tick_interval,
            in_flight: Arc::new(Semaphore::new(DEFAULT_MAX_IN_FLIGHT)),
        }
    }

    pub fn max_in_flight(mut self, n: usize) -> Self {
        self.in_flight = Arc::new(Semaphore::new(n.max(1)));
        self
    }

    /// Tick until `shutdown` turns `true` (or its sender is dropped).
    ///
    /// Returns the number of ticks run.  Publishes already in flight when
    /// the driver stops are left to finish on their own.
    pub async fn run<O: FleetObserver>(
        &self,
        fleet:        &mut Fleet,
        observer:     &mut O,
        mut shutdown: watch::Receiver<bool>,
    ) -> u64 {
        info!(
            "simulator started: {} vehicles, tick every {:?}, topic {:?}",
            fleet.len(),
            self.tick_interval,
            self.topic
        );

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Holds at most one error per in-flight publish.
        let (err_tx, mut err_rx) = mpsc::unbounded_channel::<(VehicleId, TransportError)>();
        let mut tick = Tick::ZERO;

        while !*shutdown.borrow() {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }

                Some((vehicle, error)) = err_rx.recv() => {
                    warn!("publish failed for {vehicle}: {error}");
                    observer.on_publish_error(&vehicle, &error);
                }

                _ = interval.tick() => {
                    observer.on_tick_start(tick);
                    let events = fleet.tick(self.clock.now_ms());
                    let mut dropped = 0usize;
                    for event in &events {
                        match Arc::clone(&self.in_flight).try_acquire_owned() {
                            Ok(permit) => self.spawn_publish(event.clone(), permit, err_tx.clone()),
                            Err(_) => {
                                dropped += 1;
                                let error = TransportError::Unavailable("publish backlog full".to_string());
                                observer.on_publish_error(&event.vehicle_id, &error);
                            }
                        }
                    }
                    if dropped > 0 {
                        warn!("tick {tick}: {dropped} events dropped, publish backlog full");
                    }
                    observer.on_tick_end(tick, &events);
                    tick = tick.next();
                }
            }
        }

        observer.on_stop(tick.0);
        tick.0
    }

    fn spawn_publish(
        &self,
        event:  LocationEvent,
        permit: OwnedSemaphorePermit,
        errors: mpsc::UnboundedSender<(VehicleId, TransportError)>,
    ) {
        let publisher = Arc::clone(&self.publisher);
        let topic = Arc::clone(&self.topic);
        tokio::spawn(async move {
            let _permit = permit;
            let payload = event.to_json();
            if let Err(e) = publisher.publish(&topic, event.vehicle_id.as_str(), payload).await {
                // The driver may already be gone; nothing left to report to.
                let _ = errors.send((event.vehicle_id, e));
            }
        });
    }
}
