//! Aggregate stores written by the processor.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use bt_core::{GeoPoint, LocationEvent, VehicleId};
use bt_spatial::{GridCell, GridSpec, VehicleIndex};

use crate::{DensityGrid, StoreResult};

/// Write side of the processor's state.
///
/// Each method is one atomic single-key mutation; implementations need no
/// lock spanning keys.
pub trait PositionStore: Send + Sync + 'static {
    /// LatestPosition[vehicle] = event.
    fn upsert_latest(&self, event: &LocationEvent) -> StoreResult<()>;

    /// SpatialIndex[vehicle] = position.
    fn upsert_position(&self, vehicle: &VehicleId, position: GeoPoint) -> StoreResult<()>;

    /// Density[cell] += 1 with a fresh expiry; returns the new count.
    fn increment_density(&self, cell: GridCell, now_ms: i64) -> StoreResult<u64>;
}

impl<S: PositionStore> PositionStore for Arc<S> {
    fn upsert_latest(&self, event: &LocationEvent) -> StoreResult<()> {
        (**self).upsert_latest(event)
    }

    fn upsert_position(&self, vehicle: &VehicleId, position: GeoPoint) -> StoreResult<()> {
        (**self).upsert_position(vehicle, position)
    }

    fn increment_density(&self, cell: GridCell, now_ms: i64) -> StoreResult<u64> {
        (**self).increment_density(cell, now_ms)
    }
}

/// In-process store: latest events, R-tree index, density grid.
pub struct MemoryStore {
    latest:  DashMap<VehicleId, LocationEvent>,
    index:   VehicleIndex,
    density: DensityGrid,
}

impl MemoryStore {
    pub fn new(grid: GridSpec, density_ttl: Duration) -> Self {
        Self {
            latest:  DashMap::new(),
            index:   VehicleIndex::new(),
            density: DensityGrid::new(grid, density_ttl),
        }
    }

    #[inline]
    pub fn grid(&self) -> GridSpec {
        self.density.spec()
    }

    pub fn latest(&self, vehicle: &VehicleId) -> Option<LocationEvent> {
        self.latest.get(vehicle).map(|e| e.value().clone())
    }

    /// Every vehicle's latest event, ordered by vehicle id.
    pub fn all_latest(&self) -> Vec<LocationEvent> {
        let mut out: Vec<LocationEvent> = self.latest.iter().map(|e| e.value().clone()).collect();
        out.sort_by(|a, b| a.vehicle_id.cmp(&b.vehicle_id));
        out
    }

    pub fn index(&self) -> &VehicleIndex {
        &self.index
    }

    pub fn density(&self) -> &DensityGrid {
        &self.density
    }
}

impl PositionStore for MemoryStore {
    fn upsert_latest(&self, event: &LocationEvent) -> StoreResult<()> {
        self.latest.insert(event.vehicle_id.clone(), event.clone());
        Ok(())
    }

    fn upsert_position(&self, vehicle: &VehicleId, position: GeoPoint) -> StoreResult<()> {
        self.index.upsert(vehicle, position);
        Ok(())
    }

    fn increment_density(&self, cell: GridCell, now_ms: i64) -> StoreResult<u64> {
        Ok(self.density.increment(cell, now_ms))
    }
}
