//! The per-tick motion model.

use rand::Rng;

use crate::{Direction, VehicleState};

/// Largest progress value representable below 1.0.
const PROGRESS_CEILING: f64 = 1.0 - f64::EPSILON;

/// Whole round trips beyond this many in one tick still move the vehicle
/// correctly but only replay passenger events for the first few.
const MAX_FOLDED_LAPS: u64 = 4;

/// Tunable constants of the motion model.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MotionParams {
    /// Per-tick chance of re-rolling the target speed.
    pub reroll_probability: f64,
    /// Inclusive range of a re-rolled target speed, km/h.
    pub target_speed_kmh:   (f64, f64),
    /// Fraction of the gap to target speed closed each tick.
    pub smoothing:          f64,
    /// Chance that crossing an interior vertex counts as a stop.
    pub stop_probability:   f64,
    /// Passenger change per event is uniform in `[-max_delta, max_delta]`.
    pub max_passenger_delta: i32,
    /// Passenger counts are clamped to `[0, capacity]`.
    pub capacity:           u32,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            reroll_probability:  0.05,
            target_speed_kmh:    (20.0, 60.0),
            smoothing:           0.1,
            stop_probability:    0.2,
            max_passenger_delta: 5,
            capacity:            60,
        }
    }
}

/// What happened during one call to [`MotionModel::advance`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Step {
    /// Distance budget of the tick, km.
    pub distance_km: f64,
    /// Direction flips at a route end.
    pub reversals:   u32,
    /// Interior vertices that triggered a passenger change.
    pub stops:       u32,
}

/// Advances [`VehicleState`]s along their routes.
#[derive(Copy, Clone, Debug, Default)]
pub struct MotionModel {
    pub params: MotionParams,
}

impl MotionModel {
    pub fn new(params: MotionParams) -> Self {
        Self { params }
    }

    /// Move `state` forward by `elapsed_secs` of travel.
    ///
    /// Zero, negative, or non-finite elapsed time leaves the state untouched.
    /// The walk is segment-by-segment and whole round trips are folded away
    /// first, so the loop is bounded by about two passes over the route no
    /// matter how large the budget.
    ///
    /// Every reversal and every stop the walk crosses changes passengers,
    /// with one exception: when a single tick covers more than
    /// `MAX_FOLDED_LAPS` (4) whole round trips, only the reversals and stops
    /// of the first four are replayed.  The rest move the vehicle but skip
    /// their passenger changes, and are not counted in the returned
    /// [`Step`].
    pub fn advance<R: Rng + ?Sized>(
        &self,
        state:        &mut VehicleState,
        elapsed_secs: f64,
        rng:          &mut R,
    ) -> Step {
        let mut step = Step::default();
        if !(elapsed_secs.is_finite() && elapsed_secs > 0.0) {
            return step;
        }

        self.drift_speed(state, rng);

        let mut budget = state.speed_kmh / 3_600.0 * elapsed_secs;
        step.distance_km = budget;

        // A round trip returns the vehicle to the same point and direction.
        let lap_km = 2.0 * state.path.total_km();
        if budget >= lap_km {
            let laps = (budget / lap_km).floor();
            budget = (budget - laps * lap_km).max(0.0);
            let interior = state.path.segment_count() as u64 - 1;
            for _ in 0..(laps as u64).min(MAX_FOLDED_LAPS) {
                for _ in 0..2 {
                    self.change_passengers(state, rng);
                    step.reversals += 1;
                }
                for _ in 0..2 * interior {
                    if chance(rng, self.params.stop_probability) {
                        self.change_passengers(state, rng);
                        step.stops += 1;
                    }
                }
            }
        }

        let last = state.path.last_segment();
        while budget > 0.0 {
            let len = state.path.segment_len_km(state.segment);
            let room = len * (1.0 - state.progress);

            if budget < room {
                state.progress = (state.progress + budget / len).min(PROGRESS_CEILING);
                break;
            }

            budget -= room;
            state.progress = 0.0;

            let at_end = match state.direction {
                Direction::Forward => state.segment == last,
                Direction::Reverse => state.segment == 0,
            };
            if at_end {
                state.direction = state.direction.flipped();
                self.change_passengers(state, rng);
                step.reversals += 1;
            } else {
                match state.direction {
                    Direction::Forward => state.segment += 1,
                    Direction::Reverse => state.segment -= 1,
                }
                if chance(rng, self.params.stop_probability) {
                    self.change_passengers(state, rng);
                    step.stops += 1;
                }
            }
        }

        step
    }

    /// Occasionally pick a new target speed, then ease toward it.
    fn drift_speed<R: Rng + ?Sized>(&self, state: &mut VehicleState, rng: &mut R) {
        if chance(rng, self.params.reroll_probability) {
            let (lo, hi) = self.params.target_speed_kmh;
            state.target_speed_kmh = rng.gen_range(lo..=hi);
        }
        state.speed_kmh += (state.target_speed_kmh - state.speed_kmh) * self.params.smoothing;
    }

    /// Apply a uniform random passenger delta, clamped to capacity.
    fn change_passengers<R: Rng + ?Sized>(&self, state: &mut VehicleState, rng: &mut R) {
        let d = self.params.max_passenger_delta;
        let delta = rng.gen_range(-d..=d);
        let next = (state.passengers as i64 + delta as i64).clamp(0, self.params.capacity as i64);
        state.passengers = next as u32;
    }
}

#[inline]
fn chance<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.gen_bool(p.clamp(0.0, 1.0))
}
