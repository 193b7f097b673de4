//! Fluent builder for constructing a [`Fleet`].

use std::collections::HashSet;
use std::sync::Arc;

use bt_core::{Clock, Route, SystemClock, VehicleId, VehicleRng};
use bt_motion::{Direction, MotionModel, MotionParams, VehicleState};
use bt_spatial::RoutePath;

use crate::{Fleet, FleetError, FleetResult, SimVehicle};

/// Vehicles per route when neither `vehicles_per_route` nor `population`
/// is given.
pub const DEFAULT_VEHICLES_PER_ROUTE: usize = 10;

enum Sizing {
    PerRoute(usize),
    Population(usize),
}

/// Fluent builder for [`Fleet`].
///
/// # Optional inputs (have defaults)
///
/// | Method                     | Default                          |
/// |----------------------------|----------------------------------|
/// | `.vehicles_per_route(n)`   | 10                               |
/// | `.population(total)`       | off; overrides the per-route count |
/// | `.params(p)`               | `MotionParams::default()`        |
/// | `.start_ms(ms)`            | wall-clock now                   |
///
/// # Initial state
///
/// Each vehicle draws from its own [`VehicleRng`] (seeded by fleet index):
/// segment and progress uniform along the route, speed uniform in
/// `[30, 50)` km/h, passengers uniform in `[0, 30)`, heading forward.
pub struct FleetBuilder {
    routes:   Vec<Route>,
    seed:     u64,
    sizing:   Sizing,
    params:   MotionParams,
    start_ms: Option<i64>,
}

impl FleetBuilder {
    pub fn new(routes: Vec<Route>, seed: u64) -> Self {
        Self {
            routes,
            seed,
            sizing: Sizing::PerRoute(DEFAULT_VEHICLES_PER_ROUTE),
            params: MotionParams::default(),
            start_ms: None,
        }
    }

    pub fn vehicles_per_route(mut self, n: usize) -> Self {
        self.sizing = Sizing::PerRoute(n);
        self
    }

    /// Spread `total` vehicles evenly over the routes; the first
    /// `total % routes` routes get one extra.
    pub fn population(mut self, total: usize) -> Self {
        self.sizing = Sizing::Population(total);
        self
    }

    pub fn params(mut self, params: MotionParams) -> Self {
        self.params = params;
        self
    }

    /// Timestamp the vehicles were last "updated"; the first tick advances
    /// them by the time elapsed since.
    pub fn start_ms(mut self, ms: i64) -> Self {
        self.start_ms = Some(ms);
        self
    }

    pub fn build(self) -> FleetResult<Fleet> {
        if self.routes.is_empty() {
            return Err(FleetError::NoRoutes);
        }
        let mut seen = HashSet::with_capacity(self.routes.len());
        if let Some(dup) = self.routes.iter().find(|r| !seen.insert(r.id.clone())) {
            return Err(FleetError::DuplicateRoute(dup.id.clone()));
        }

        let counts = slot_counts(&self.sizing, self.routes.len());
        if counts.iter().all(|&c| c == 0) {
            return Err(FleetError::ZeroVehicles);
        }

        let start_ms = self.start_ms.unwrap_or_else(|| SystemClock.now_ms());
        let mut vehicles = Vec::with_capacity(counts.iter().sum());

        for (route, &count) in self.routes.iter().zip(&counts) {
            let path = Arc::new(RoutePath::from_route(route));
            for slot in 0..count {
                let mut rng = VehicleRng::new(self.seed, vehicles.len() as u32);
                let state = VehicleState::new(
                    VehicleId::for_slot(&route.id, slot),
                    Arc::clone(&path),
                    rng.gen_range(0..path.segment_count()),
                    rng.gen_range(0.0..1.0),
                    rng.gen_range(30.0..50.0),
                    rng.gen_range(0..30),
                    Direction::Forward,
                    start_ms,
                )?;
                vehicles.push(SimVehicle::new(state, rng));
            }
        }

        Ok(Fleet::new(vehicles, MotionModel::new(self.params)))
    }
}

fn slot_counts(sizing: &Sizing, routes: usize) -> Vec<usize> {
    match *sizing {
        Sizing::PerRoute(n) => vec![n; routes],
        Sizing::Population(total) => {
            let (base, extra) = (total / routes, total % routes);
            (0..routes).map(|i| base + usize::from(i < extra)).collect()
        }
    }
}
