//! Unit tests for bt-fleet.

use bt_core::{GeoPoint, Route};

use crate::{Fleet, FleetBuilder};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn route(id: &str, coords: &[(f64, f64)]) -> Route {
    let vertices = coords.iter().map(|&(lon, lat)| GeoPoint::from_lon_lat(lon, lat)).collect();
    Route::new(id, format!("route {id}"), "#FF0000", vertices).unwrap()
}

fn routes() -> Vec<Route> {
    vec![
        route("1", &[(77.5702, 12.9779), (77.5843, 12.9754), (77.6078, 12.9744), (77.6186, 12.9740)]),
        route("2", &[(77.5702, 12.9779), (77.5794, 12.9642)]),
        route("3", &[(77.7044, 12.9520), (77.6830, 12.9912), (77.6715, 13.0112)]),
    ]
}

fn fleet(per_route: usize, seed: u64) -> Fleet {
    FleetBuilder::new(routes(), seed)
        .vehicles_per_route(per_route)
        .start_ms(0)
        .build()
        .unwrap()
}

// ── FleetBuilder ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use super::*;
    use crate::FleetError;
    use bt_core::VehicleId;

    #[test]
    fn default_is_ten_per_route() {
        let f = FleetBuilder::new(routes(), 1).start_ms(0).build().unwrap();
        assert_eq!(f.len(), 30);
    }

    #[test]
    fn vehicle_ids_follow_route_and_slot() {
        let f = fleet(4, 1);
        assert!(f.get(&VehicleId::new("bus-0001-3")).is_some());
        assert!(f.get(&VehicleId::new("bus-0003-0")).is_some());
        assert!(f.get(&VehicleId::new("bus-0001-4")).is_none());
        let ids: Vec<&str> = f.states().take(2).map(|s| s.vehicle_id.as_str()).collect();
        assert_eq!(ids, ["bus-0001-0", "bus-0001-1"]);
    }

    #[test]
    fn population_spreads_remainder_to_first_routes() {
        let f = FleetBuilder::new(routes(), 1).population(10).start_ms(0).build().unwrap();
        let on = |r: &str| f.states().filter(|s| s.route_id.as_str() == r).count();
        assert_eq!((on("1"), on("2"), on("3")), (4, 3, 3));
    }

    #[test]
    fn initial_state_ranges() {
        let f = fleet(50, 7);
        for s in f.states() {
            assert!(s.segment < s.path.segment_count());
            assert!((0.0..1.0).contains(&s.progress));
            assert!((30.0..50.0).contains(&s.speed_kmh));
            assert_eq!(s.target_speed_kmh, s.speed_kmh);
            assert!(s.passengers < 30);
            assert_eq!(s.last_update_ms, 0);
        }
    }

    #[test]
    fn placement_is_spread_out() {
        let f = fleet(50, 7);
        let first: Vec<_> = f.states().filter(|s| s.route_id.as_str() == "1").map(|s| s.segment).collect();
        for seg in 0..3 {
            assert!(first.contains(&seg), "no vehicle starts on segment {seg}");
        }
    }

    #[test]
    fn same_seed_same_fleet() {
        let a: Vec<_> = fleet(5, 42).states().map(|s| (s.segment, s.progress, s.passengers)).collect();
        let b: Vec<_> = fleet(5, 42).states().map(|s| (s.segment, s.progress, s.passengers)).collect();
        let c: Vec<_> = fleet(5, 43).states().map(|s| (s.segment, s.progress, s.passengers)).collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn rejects_empty_inputs() {
        assert!(matches!(FleetBuilder::new(vec![], 1).build(), Err(FleetError::NoRoutes)));
        assert!(matches!(
            FleetBuilder::new(routes(), 1).vehicles_per_route(0).build(),
            Err(FleetError::ZeroVehicles)
        ));
        assert!(matches!(FleetBuilder::new(routes(), 1).population(0).build(), Err(FleetError::ZeroVehicles)));
    }

    #[test]
    fn rejects_duplicate_route_ids() {
        let mut rs = routes();
        rs.push(rs[0].clone());
        assert!(matches!(FleetBuilder::new(rs, 1).build(), Err(FleetError::DuplicateRoute(_))));
    }
}

// ── Fleet::tick ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tick {
    use super::*;

    #[test]
    fn one_event_per_vehicle_stamped_now() {
        let mut f = fleet(3, 1);
        let events = f.tick(1_000);
        assert_eq!(events.len(), 9);
        assert!(events.iter().all(|e| e.timestamp == 1_000));
        let ids: Vec<_> = f.states().map(|s| s.vehicle_id.clone()).collect();
        let event_ids: Vec<_> = events.iter().map(|e| e.vehicle_id.clone()).collect();
        assert_eq!(ids, event_ids);
    }

    #[test]
    fn no_elapsed_time_no_movement() {
        let mut f = fleet(3, 1);
        let first = f.tick(5_000);
        let again = f.tick(5_000);
        let earlier = f.tick(4_000);
        for ((a, b), c) in first.iter().zip(&again).zip(&earlier) {
            assert_eq!((a.latitude, a.longitude, a.passengers), (b.latitude, b.longitude, b.passengers));
            assert_eq!((a.latitude, a.longitude), (c.latitude, c.longitude));
        }
        assert!(f.states().all(|s| s.last_update_ms == 5_000));
    }

    #[test]
    fn vehicles_move_between_ticks() {
        let mut f = fleet(3, 1);
        let a = f.tick(1_000);
        let b = f.tick(11_000);
        let moved = a.iter().zip(&b).filter(|(x, y)| x.position() != y.position()).count();
        assert_eq!(moved, a.len());
        for (x, y) in a.iter().zip(&b) {
            // At most 60 km/h for 10 s.
            assert!(x.position().distance_km(y.position()) <= 60.0 / 360.0 * 1.01);
        }
    }

    #[test]
    fn long_run_keeps_invariants() {
        let mut f = fleet(10, 9);
        for t in 1..=2_000 {
            for e in f.tick(t * 1_000) {
                assert!(e.passengers <= 60);
                assert!(e.position().is_valid());
            }
        }
        for s in f.states() {
            assert!(s.segment <= s.path.last_segment());
            assert!((0.0..1.0).contains(&s.progress));
        }
    }

    #[test]
    fn same_seed_same_trajectory() {
        let run = || {
            let mut f = fleet(4, 5);
            (1..=100).map(|t| f.tick(t * 1_000)).last().unwrap()
        };
        assert_eq!(run(), run());
    }
}

// ── FleetDriver ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod driver {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::watch;

    use bt_core::{LocationEvent, ManualClock, Tick, VehicleId};
    use bt_transport::{MemoryBroker, Publisher, StartFrom, Subscriber, TransportError, TransportResult};

    use super::*;
    use crate::{FleetDriver, FleetObserver};

    /// Stops the driver after `limit` ticks and records what it saw.
    struct StopAfter {
        limit:    u64,
        stop:     watch::Sender<bool>,
        ticks:    u64,
        events:   usize,
        failures: Vec<VehicleId>,
        stopped:  Option<u64>,
    }

    impl StopAfter {
        fn new(limit: u64) -> (Self, watch::Receiver<bool>) {
            let (stop, rx) = watch::channel(false);
            let obs = Self { limit, stop, ticks: 0, events: 0, failures: Vec::new(), stopped: None };
            (obs, rx)
        }
    }

    impl FleetObserver for StopAfter {
        fn on_tick_end(&mut self, _tick: Tick, events: &[LocationEvent]) {
            self.ticks += 1;
            self.events += events.len();
            if self.ticks == self.limit {
                let _ = self.stop.send(true);
            }
        }

        fn on_publish_error(&mut self, vehicle: &VehicleId, _error: &TransportError) {
            self.failures.push(vehicle.clone());
        }

        fn on_stop(&mut self, ticks: u64) {
            self.stopped = Some(ticks);
        }
    }

    /// Rejects everything published for one vehicle.
    struct RejectOne {
        inner: bt_transport::MemoryProducer,
        bad:   String,
    }

    impl Publisher for RejectOne {
        async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> TransportResult<()> {
            if key == self.bad {
                return Err(TransportError::Unavailable(format!("{key} rejected")));
            }
            self.inner.publish(topic, key, payload).await
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_every_vehicle_every_tick() {
        let broker = MemoryBroker::new(4);
        let clock = Arc::new(ManualClock::new(0));
        let driver = FleetDriver::new(Arc::new(broker.producer()), Arc::clone(&clock), "bus-updates", Duration::from_secs(1));
        let mut f = fleet(2, 3);
        let (mut obs, shutdown) = StopAfter::new(3);

        let ticks = driver.run(&mut f, &mut obs, shutdown).await;
        settle().await;

        assert_eq!(ticks, 3);
        assert_eq!(obs.stopped, Some(3));
        assert_eq!(obs.events, 18);
        assert_eq!(broker.topic_len("bus-updates"), 18);

        let mut sub = broker.subscribe("bus-updates", "check", StartFrom::Earliest).unwrap();
        let d = sub.next().await.unwrap();
        let event = LocationEvent::from_json(&d.payload).unwrap();
        assert_eq!(d.key.as_deref(), Some(event.vehicle_id.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn one_failing_vehicle_does_not_stop_the_rest() {
        let broker = MemoryBroker::new(4);
        let publisher = RejectOne { inner: broker.producer(), bad: "bus-0002-1".to_string() };
        let driver = FleetDriver::new(Arc::new(publisher), ManualClock::new(0), "bus-updates", Duration::from_secs(1));
        let mut f = fleet(2, 3);
        let (mut obs, shutdown) = StopAfter::new(4);

        let ticks = driver.run(&mut f, &mut obs, shutdown).await;
        settle().await;

        assert_eq!(ticks, 4);
        assert_eq!(broker.topic_len("bus-updates"), 4 * 5);
        // Failures reported while the driver was still running.
        assert!(!obs.failures.is_empty());
        assert!(obs.failures.iter().all(|v| v.as_str() == "bus-0002-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn broker_outage_keeps_ticking() {
        let broker = MemoryBroker::new(1);
        broker.set_available(false);
        let driver = FleetDriver::new(Arc::new(broker.producer()), ManualClock::new(0), "bus-updates", Duration::from_secs(1));
        let mut f = fleet(1, 3);
        let (mut obs, shutdown) = StopAfter::new(5);

        assert_eq!(driver.run(&mut f, &mut obs, shutdown).await, 5);
        assert_eq!(broker.topic_len("bus-updates"), 0);
        assert_eq!(obs.events, 15);
    }

    /// Accepts every publish and never completes it.
    struct Stalled;

    impl Publisher for Stalled {
        async fn publish(&self, _: &str, _: &str, _: Vec<u8>) -> TransportResult<()> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_publishes_are_capped() {
        let driver = FleetDriver::new(Arc::new(Stalled), ManualClock::new(0), "bus-updates", Duration::from_secs(1))
            .max_in_flight(4);
        let mut f = fleet(2, 3);
        let (mut obs, shutdown) = StopAfter::new(3);

        assert_eq!(driver.run(&mut f, &mut obs, shutdown).await, 3);
        // 6 vehicles per tick, 4 slots held forever: 2 + 6 + 6 dropped.
        assert_eq!(obs.events, 18);
        assert_eq!(obs.failures.len(), 14);
    }

    #[tokio::test(start_paused = true)]
    async fn already_shut_down_runs_nothing() {
        let broker = MemoryBroker::new(1);
        let driver = FleetDriver::new(Arc::new(broker.producer()), ManualClock::new(0), "t", Duration::from_secs(1));
        let mut f = fleet(1, 3);
        let (mut obs, shutdown) = StopAfter::new(5);
        obs.stop.send(true).unwrap();

        assert_eq!(driver.run(&mut f, &mut obs, shutdown).await, 0);
        assert_eq!(obs.stopped, Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_follow_the_clock() {
        let broker = MemoryBroker::new(1);
        let clock = Arc::new(ManualClock::new(0));
        let driver = FleetDriver::new(Arc::new(broker.producer()), Arc::clone(&clock), "t", Duration::from_secs(1));
        let mut f = fleet(1, 3);
        let before: Vec<_> = f.states().map(|s| s.position()).collect();

        // Clock never moves: vehicles stay put.
        let (mut obs, shutdown) = StopAfter::new(3);
        driver.run(&mut f, &mut obs, shutdown).await;
        let after: Vec<_> = f.states().map(|s| s.position()).collect();
        assert_eq!(before, after);

        clock.advance_secs(30);
        let (mut obs, shutdown) = StopAfter::new(1);
        driver.run(&mut f, &mut obs, shutdown).await;
        assert!(f.states().all(|s| s.last_update_ms == 30_000));
    }
}
