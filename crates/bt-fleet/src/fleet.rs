//! The `Fleet` and its per-tick advance.

use bt_core::{LocationEvent, VehicleId, VehicleRng};
use bt_motion::{MotionModel, VehicleState};

/// One simulated vehicle and its private random source.
#[derive(Debug, Clone)]
pub struct SimVehicle {
    pub state: VehicleState,
    rng:       VehicleRng,
}

impl SimVehicle {
    pub fn new(state: VehicleState, rng: VehicleRng) -> Self {
        Self { state, rng }
    }

    /// Advance to `now_ms` and snapshot the result.
    fn step(&mut self, model: &MotionModel, now_ms: i64) -> LocationEvent {
        let elapsed_ms = now_ms - self.state.last_update_ms;
        if elapsed_ms > 0 {
            model.advance(&mut self.state, elapsed_ms as f64 / 1_000.0, &mut self.rng);
            self.state.last_update_ms = now_ms;
        }
        self.state.to_event(now_ms)
    }
}

/// All simulated vehicles.  Exclusively owned by the tick driver.
///
/// Create via [`FleetBuilder`][crate::FleetBuilder].
pub struct Fleet {
    vehicles: Vec<SimVehicle>,
    model:    MotionModel,
}

impl Fleet {
    pub(crate) fn new(vehicles: Vec<SimVehicle>, model: MotionModel) -> Self {
        Self { vehicles, model }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn states(&self) -> impl Iterator<Item = &VehicleState> {
        self.vehicles.iter().map(|v| &v.state)
    }

    pub fn get(&self, id: &VehicleId) -> Option<&VehicleState> {
        self.states().find(|s| &s.vehicle_id == id)
    }

    /// Advance every vehicle to `now_ms`; one event per vehicle, in fleet
    /// order.
    ///
    /// A `now_ms` at or before a vehicle's last update leaves it in place
    /// but still emits its current position.
    pub fn tick(&mut self, now_ms: i64) -> Vec<LocationEvent> {
        let model = &self.model;

        #[cfg(not(feature = "parallel"))]
        {
            self.vehicles.iter_mut().map(|v| v.step(model, now_ms)).collect()
        }

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            self.vehicles.par_iter_mut().map(|v| v.step(model, now_ms)).collect()
        }
    }
}
