//! Vehicle spatial index.
//!
//! # Layout
//!
//! An R-tree (via `rstar`) over `[lat, lon]` points answers radius and
//! nearest-neighbour queries.  R-tree entries cannot be updated in place, so
//! a side map `VehicleId → GeoPoint` remembers each vehicle's current entry;
//! an upsert removes the old entry and inserts the new one under a single
//! write lock.  Re-upserting an unchanged position is a no-op, which makes
//! duplicate deliveries harmless.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use bt_core::{BoundingBox, GeoPoint, VehicleId};

// ── R-tree entry ──────────────────────────────────────────────────────────────

/// Entry stored in the R-tree: a 2-D `[lat, lon]` point with its vehicle.
#[derive(Clone, Debug, PartialEq)]
struct VehicleEntry {
    point: [f64; 2], // [lat, lon]
    id:    VehicleId,
}

impl VehicleEntry {
    fn new(id: VehicleId, p: GeoPoint) -> Self {
        Self { point: [p.lat, p.lon], id }
    }

    fn geo(&self) -> GeoPoint {
        GeoPoint::new(self.point[0], self.point[1])
    }
}

impl RTreeObject for VehicleEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for VehicleEntry {
    /// Squared Euclidean distance in lat/lon space.  Good enough to order
    /// candidates within a city; callers needing kilometres re-measure with
    /// haversine.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.point[0] - point[0];
        let dlon = self.point[1] - point[1];
        dlat * dlat + dlon * dlon
    }
}

// ── Neighbor ──────────────────────────────────────────────────────────────────

/// A vehicle returned by a spatial query.
#[derive(Clone, Debug, PartialEq)]
pub struct Neighbor {
    pub vehicle_id:  VehicleId,
    pub position:    GeoPoint,
    /// Haversine distance from the query point.
    pub distance_km: f64,
}

// ── VehicleIndex ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct Inner {
    tree:      RTree<VehicleEntry>,
    positions: HashMap<VehicleId, GeoPoint>,
}

/// Thread-safe spatial index holding one point per vehicle.
#[derive(Default)]
pub struct VehicleIndex {
    inner: RwLock<Inner>,
}

impl VehicleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `id`'s position to `p`.  Returns `true` if the index changed.
    pub fn upsert(&self, id: &VehicleId, p: GeoPoint) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match inner.positions.get(id) {
            Some(&old) if old == p => return false,
            Some(&old) => {
                inner.tree.remove(&VehicleEntry::new(id.clone(), old));
            }
            None => {}
        }
        inner.tree.insert(VehicleEntry::new(id.clone(), p));
        inner.positions.insert(id.clone(), p);
        true
    }

    /// Drop `id` from the index.  Returns its last position, if any.
    pub fn remove(&self, id: &VehicleId) -> Option<GeoPoint> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let old = inner.positions.remove(id)?;
        inner.tree.remove(&VehicleEntry::new(id.clone(), old));
        Some(old)
    }

    /// Current position of `id`.
    pub fn get(&self, id: &VehicleId) -> Option<GeoPoint> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.positions.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All vehicles within `radius_km` of `center`, nearest first.
    ///
    /// The R-tree prefilters with a lat/lon box wide enough to contain the
    /// circle; candidates are then measured with haversine.
    pub fn within_radius(&self, center: GeoPoint, radius_km: f64) -> Vec<Neighbor> {
        if radius_km.is_nan() || radius_km < 0.0 {
            return Vec::new();
        }
        let bbox = BoundingBox::around(center, radius_km);
        let envelope = AABB::from_corners([bbox.min.lat, bbox.min.lon], [bbox.max.lat, bbox.max.lon]);

        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut hits: Vec<Neighbor> = inner
            .tree
            .locate_in_envelope(&envelope)
            .map(|e| Neighbor {
                vehicle_id:  e.id.clone(),
                position:    e.geo(),
                distance_km: center.distance_km(e.geo()),
            })
            .filter(|n| n.distance_km <= radius_km)
            .collect();
        drop(inner);

        hits.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        hits
    }

    /// Up to `k` vehicles nearest to `center`, sorted by ascending distance.
    pub fn nearest(&self, center: GeoPoint, k: usize) -> Vec<Neighbor> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .tree
            .nearest_neighbor_iter(&[center.lat, center.lon])
            .take(k)
            .map(|e| Neighbor {
                vehicle_id:  e.id.clone(),
                position:    e.geo(),
                distance_km: center.distance_km(e.geo()),
            })
            .collect()
    }

    /// Copy of every `(vehicle, position)` pair, in no particular order.
    pub fn snapshot(&self) -> Vec<(VehicleId, GeoPoint)> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.positions.iter().map(|(id, p)| (id.clone(), *p)).collect()
    }
}
