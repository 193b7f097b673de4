//! Read-only lookups over the processor's stores.

use std::sync::Arc;

use bt_core::{BoundingBox, Clock, GeoPoint, LocationEvent, VehicleId};
use bt_spatial::{GridCell, Neighbor};

use crate::{MemoryStore, ProcessorStats, StatsSnapshot};

/// What an API layer gets: lookups and snapshots, never write access.
pub struct QueryView<C: Clock> {
    store: Arc<MemoryStore>,
    stats: Arc<ProcessorStats>,
    clock: C,
}

impl<C: Clock> QueryView<C> {
    pub fn new(store: Arc<MemoryStore>, stats: Arc<ProcessorStats>, clock: C) -> Self {
        Self { store, stats, clock }
    }

    /// Latest event seen for `vehicle`.
    pub fn latest(&self, vehicle: &VehicleId) -> Option<LocationEvent> {
        self.store.latest(vehicle)
    }

    /// Latest event of every known vehicle, ordered by id.
    pub fn snapshot(&self) -> Vec<LocationEvent> {
        self.store.all_latest()
    }

    /// Vehicles within `radius_km` of `center`, nearest first.
    pub fn within_radius(&self, center: GeoPoint, radius_km: f64) -> Vec<Neighbor> {
        self.store.index().within_radius(center, radius_km)
    }

    /// The `k` vehicles closest to `center`, nearest first.
    pub fn nearest(&self, center: GeoPoint, k: usize) -> Vec<Neighbor> {
        self.store.index().nearest(center, k)
    }

    /// Live density cells overlapping `bbox`.
    pub fn density_in(&self, bbox: &BoundingBox) -> Vec<(GridCell, u64)> {
        self.store.density().cells_in(bbox, self.clock.now_ms())
    }

    /// Density of the cell containing `p`.
    pub fn density_at(&self, p: GeoPoint) -> u64 {
        let density = self.store.density();
        density.count(density.spec().cell(p), self.clock.now_ms())
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}
