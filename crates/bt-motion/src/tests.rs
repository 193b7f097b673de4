//! Unit tests for bt-motion.

use std::sync::Arc;

use bt_core::{GeoPoint, Route, VehicleId, VehicleRng};
use bt_spatial::RoutePath;

use crate::{Direction, MotionModel, MotionParams, VehicleState};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// A = (77.5702, 12.9779), B = (77.5843, 12.9754): one ~1.55 km segment.
fn two_vertex_path() -> Arc<RoutePath> {
    let route = Route::new(
        "1",
        "A-B",
        "#FF0000",
        vec![GeoPoint::from_lon_lat(77.5702, 12.9779), GeoPoint::from_lon_lat(77.5843, 12.9754)],
    )
    .unwrap();
    Arc::new(RoutePath::from_route(&route))
}

/// First fallback route: five vertices, four segments.
fn five_vertex_path() -> Arc<RoutePath> {
    let route = Route::new(
        "1",
        "Majestic - Indiranagar",
        "#FF0000",
        vec![
            GeoPoint::from_lon_lat(77.5702, 12.9779),
            GeoPoint::from_lon_lat(77.5843, 12.9754),
            GeoPoint::from_lon_lat(77.6078, 12.9744),
            GeoPoint::from_lon_lat(77.6186, 12.9740),
            GeoPoint::from_lon_lat(77.6408, 12.9784),
        ],
    )
    .unwrap();
    Arc::new(RoutePath::from_route(&route))
}

fn vehicle(path: Arc<RoutePath>, segment: usize, progress: f64, speed: f64) -> VehicleState {
    VehicleState::new(VehicleId::new("bus-0001-0"), path, segment, progress, speed, 20, Direction::Forward, 0)
        .unwrap()
}

/// Constant speed, no stops: only reversals touch passengers.
fn steady() -> MotionModel {
    MotionModel::new(MotionParams {
        reroll_probability: 0.0,
        smoothing:          0.0,
        stop_probability:   0.0,
        ..MotionParams::default()
    })
}

fn assert_invariants(s: &VehicleState) {
    assert!(s.segment <= s.path.last_segment(), "segment {} out of range", s.segment);
    assert!((0.0..1.0).contains(&s.progress), "progress {} out of range", s.progress);
    assert!(s.passengers <= 60, "passengers {}", s.passengers);
}

// ── VehicleState ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod state {
    use super::*;

    #[test]
    fn midpoint_interpolation() {
        let s = vehicle(two_vertex_path(), 0, 0.5, 30.0);
        let p = s.position();
        assert!((p.lon - (77.5702 + 77.5843) / 2.0).abs() < 1e-12);
        assert!((p.lat - (12.9779 + 12.9754) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn reverse_progress_measured_from_far_vertex() {
        let path = two_vertex_path();
        let mut s = vehicle(path.clone(), 0, 0.25, 30.0);
        s.direction = Direction::Reverse;
        let expected = path.interpolate(0, 0.75);
        assert_eq!(s.position(), expected);
    }

    #[test]
    fn event_carries_state() {
        let s = vehicle(two_vertex_path(), 0, 0.0, 33.0);
        let e = s.to_event(1_234);
        assert_eq!(e.vehicle_id.as_str(), "bus-0001-0");
        assert_eq!(e.route_id.as_str(), "1");
        assert_eq!(e.timestamp, 1_234);
        assert_eq!(e.passengers, 20);
        assert_eq!(e.speed, 33.0);
        assert_eq!(e.longitude, 77.5702);
    }

    #[test]
    fn rejects_bad_construction() {
        let path = two_vertex_path();
        let id = VehicleId::new("v");
        assert!(VehicleState::new(id.clone(), path.clone(), 1, 0.0, 30.0, 0, Direction::Forward, 0).is_err());
        assert!(VehicleState::new(id.clone(), path.clone(), 0, 1.0, 30.0, 0, Direction::Forward, 0).is_err());
        assert!(VehicleState::new(id, path, 0, 0.0, 0.0, 0, Direction::Forward, 0).is_err());
    }
}

// ── MotionModel ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod model {
    use super::*;

    #[test]
    fn zero_elapsed_changes_nothing() {
        let model = MotionModel::default();
        let mut rng = VehicleRng::new(7, 0);
        let mut s = vehicle(five_vertex_path(), 2, 0.4, 41.0);
        let before = (s.segment, s.progress, s.speed_kmh, s.target_speed_kmh, s.passengers, s.direction);

        for elapsed in [0.0, -3.0, f64::NAN] {
            let step = model.advance(&mut s, elapsed, &mut rng);
            assert_eq!(step.distance_km, 0.0);
            assert_eq!(step.reversals + step.stops, 0);
        }
        assert_eq!(before, (s.segment, s.progress, s.speed_kmh, s.target_speed_kmh, s.passengers, s.direction));
    }

    #[test]
    fn distance_is_speed_times_time() {
        let mut rng = VehicleRng::new(1, 0);
        let path = five_vertex_path();
        let mut s = vehicle(path.clone(), 0, 0.0, 36.0); // 0.01 km/s
        let step = steady().advance(&mut s, 10.0, &mut rng);
        assert!((step.distance_km - 0.1).abs() < 1e-12);
        assert!((s.progress - 0.1 / path.segment_len_km(0)).abs() < 1e-12);
        assert_eq!(s.direction, Direction::Forward);
    }

    #[test]
    fn two_vertex_overshoot_reverses_mid_tick() {
        let mut rng = VehicleRng::new(3, 0);
        let path = two_vertex_path();
        let len = path.segment_len_km(0);
        let mut s = vehicle(path.clone(), 0, 0.5, 36.0);

        // 0.75 × segment: 0.5 to reach B, then 0.25 back toward A.
        let elapsed = 0.75 * len / 0.01;
        let step = steady().advance(&mut s, elapsed, &mut rng);

        assert_eq!(step.reversals, 1);
        assert_eq!(s.direction, Direction::Reverse);
        assert_eq!(s.segment, 0);
        assert!((s.progress - 0.25).abs() < 1e-9, "progress {}", s.progress);
        let expected = path.interpolate(0, 0.75);
        let got = s.position();
        assert!((got.lat - expected.lat).abs() < 1e-9);
        assert!((got.lon - expected.lon).abs() < 1e-9);
        assert_invariants(&s);
    }

    #[test]
    fn exact_arrival_at_end_flips_and_stops() {
        let mut rng = VehicleRng::new(3, 0);
        let path = two_vertex_path();
        let len = path.segment_len_km(0);
        let mut s = vehicle(path.clone(), 0, 0.0, 36.0);

        // A hair past B so rounding cannot leave it just short.
        steady().advance(&mut s, len / 0.01 * (1.0 + 1e-9), &mut rng);
        assert_eq!(s.direction, Direction::Reverse);
        assert_eq!(s.segment, 0);
        assert!(s.progress < 1e-6);
        let b = path.vertices()[1];
        assert!((s.position().lat - b.lat).abs() < 1e-6);
    }

    #[test]
    fn reverse_at_start_turns_forward() {
        let mut rng = VehicleRng::new(5, 0);
        let path = five_vertex_path();
        let len0 = path.segment_len_km(0);
        let mut s = vehicle(path, 0, 0.5, 36.0);
        s.direction = Direction::Reverse;

        // Half a segment to reach vertex 0, then a tenth forward again.
        let step = steady().advance(&mut s, 0.6 * len0 / 0.01, &mut rng);
        assert_eq!(step.reversals, 1);
        assert_eq!(s.direction, Direction::Forward);
        assert_eq!(s.segment, 0);
        assert!((s.progress - 0.1).abs() < 1e-9);
    }

    #[test]
    fn interior_vertex_counts_as_stop() {
        let model = MotionModel::new(MotionParams {
            reroll_probability: 0.0,
            smoothing:          0.0,
            stop_probability:   1.0,
            ..MotionParams::default()
        });
        let mut rng = VehicleRng::new(11, 0);
        let path = five_vertex_path();
        let mut s = vehicle(path.clone(), 0, 0.0, 36.0);

        let d = path.segment_len_km(0) + 0.5 * path.segment_len_km(1);
        let step = model.advance(&mut s, d / 0.01, &mut rng);
        assert_eq!(step.stops, 1);
        assert_eq!(step.reversals, 0);
        assert_eq!(s.segment, 1);
        assert!((s.progress - 0.5).abs() < 1e-9);
    }

    #[test]
    fn no_stops_when_probability_zero() {
        let mut rng = VehicleRng::new(11, 0);
        let path = five_vertex_path();
        let mut s = vehicle(path.clone(), 0, 0.0, 36.0);
        let d = path.total_km() * 0.9;
        let step = steady().advance(&mut s, d / 0.01, &mut rng);
        assert_eq!(step.stops, 0);
        assert_eq!(s.passengers, 20);
    }

    #[test]
    fn speed_eases_toward_target() {
        let model = MotionModel::new(MotionParams {
            reroll_probability: 1.0,
            target_speed_kmh:   (50.0, 50.0),
            ..MotionParams::default()
        });
        let mut rng = VehicleRng::new(2, 0);
        let mut s = vehicle(five_vertex_path(), 0, 0.0, 30.0);
        model.advance(&mut s, 1.0, &mut rng);
        assert_eq!(s.target_speed_kmh, 50.0);
        assert!((s.speed_kmh - 32.0).abs() < 1e-12);
        model.advance(&mut s, 1.0, &mut rng);
        assert!((s.speed_kmh - 33.8).abs() < 1e-12);
    }

    #[test]
    fn rerolled_targets_stay_in_range() {
        let model = MotionModel::new(MotionParams { reroll_probability: 1.0, ..MotionParams::default() });
        let mut rng = VehicleRng::new(9, 0);
        let mut s = vehicle(five_vertex_path(), 0, 0.0, 30.0);
        for _ in 0..500 {
            model.advance(&mut s, 1.0, &mut rng);
            assert!((20.0..=60.0).contains(&s.target_speed_kmh));
            assert!(s.speed_kmh > 0.0);
        }
    }

    #[test]
    fn huge_budget_terminates_with_valid_state() {
        let model = MotionModel::default();
        let mut rng = VehicleRng::new(13, 0);
        let mut s = vehicle(two_vertex_path(), 0, 0.3, 60.0);
        let step = model.advance(&mut s, 1.0e9, &mut rng);
        assert!(step.distance_km > 1.0e6);
        assert_invariants(&s);
    }

    #[test]
    fn folded_laps_replay_at_most_four_round_trips() {
        let mut rng = VehicleRng::new(13, 0);
        let path = two_vertex_path();
        let mut s = vehicle(path.clone(), 0, 0.3, 36.0);
        // 1000 round trips in one tick.
        let elapsed = 1_000.0 * 2.0 * path.total_km() / 0.01;
        let step = steady().advance(&mut s, elapsed, &mut rng);
        // Four folded laps (two reversals each) plus at most two walked.
        assert!((8..=10).contains(&step.reversals), "{}", step.reversals);
        assert_invariants(&s);
    }

    #[test]
    fn whole_round_trip_returns_to_start() {
        let mut rng = VehicleRng::new(17, 0);
        let path = five_vertex_path();
        let mut s = vehicle(path.clone(), 1, 0.25, 36.0);
        let start = s.position();
        steady().advance(&mut s, 2.0 * path.total_km() / 0.01, &mut rng);
        let end = s.position();
        assert_eq!(s.direction, Direction::Forward);
        assert!((start.lat - end.lat).abs() < 1e-9);
        assert!((start.lon - end.lon).abs() < 1e-9);
    }

    #[test]
    fn invariants_hold_over_many_random_ticks() {
        let model = MotionModel::default();
        for seed in 0..8 {
            let mut rng = VehicleRng::new(seed, 0);
            let mut s = vehicle(five_vertex_path(), 3, 0.9, 55.0);
            for i in 0..5_000 {
                // Mix of ordinary 1 s ticks and occasional long gaps.
                let elapsed = if i % 97 == 0 { 900.0 } else { 1.0 };
                model.advance(&mut s, elapsed, &mut rng);
                assert_invariants(&s);
            }
        }
    }

    #[test]
    fn passengers_clamped_at_both_bounds() {
        let model = MotionModel::new(MotionParams { stop_probability: 1.0, ..MotionParams::default() });
        let mut rng = VehicleRng::new(21, 0);
        let path = two_vertex_path();

        let mut full = vehicle(path.clone(), 0, 0.0, 60.0);
        full.passengers = 60;
        let mut empty = vehicle(path, 0, 0.0, 60.0);
        empty.passengers = 0;

        for _ in 0..2_000 {
            model.advance(&mut full, 120.0, &mut rng);
            model.advance(&mut empty, 120.0, &mut rng);
            assert!(full.passengers <= 60);
            assert!(empty.passengers <= 60);
        }
    }

    #[test]
    fn same_seed_same_trajectory() {
        let model = MotionModel::default();
        let run = || {
            let mut rng = VehicleRng::new(99, 4);
            let mut s = vehicle(five_vertex_path(), 0, 0.0, 40.0);
            for _ in 0..300 {
                model.advance(&mut s, 5.0, &mut rng);
            }
            (s.segment, s.progress, s.passengers, s.direction, s.speed_kmh)
        };
        assert_eq!(run(), run());
    }
}
