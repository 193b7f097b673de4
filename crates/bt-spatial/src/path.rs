//! Route geometry used by the motion model.
//!
//! Segment `i` is the straight span from vertex `i` to vertex `i + 1`.
//! Segment lengths are great-circle (haversine) distances computed once at
//! load, so the per-tick walk never recomputes trigonometry.

use std::sync::Arc;

use bt_core::{GeoPoint, Route, RouteId};

use crate::{SpatialError, SpatialResult};

/// Immutable polyline with cached segment lengths in kilometres.
#[derive(Debug, Clone)]
pub struct RoutePath {
    pub route_id: RouteId,
    vertices:     Arc<[GeoPoint]>,
    segment_km:   Vec<f64>,
    total_km:     f64,
}

impl RoutePath {
    /// Precompute segment lengths for a validated route.
    pub fn from_route(route: &Route) -> Self {
        let vertices = route.shared_vertices();
        let segment_km: Vec<f64> = vertices
            .windows(2)
            .map(|w| w[0].distance_km(w[1]))
            .collect();
        let total_km = segment_km.iter().sum();
        Self {
            route_id: route.id.clone(),
            vertices,
            segment_km,
            total_km,
        }
    }

    #[inline]
    pub fn vertices(&self) -> &[GeoPoint] {
        &self.vertices
    }

    /// Number of segments; always at least 1.
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segment_km.len()
    }

    /// Index of the last segment.
    #[inline]
    pub fn last_segment(&self) -> usize {
        self.segment_km.len() - 1
    }

    /// Great-circle length of `segment` in kilometres.
    #[inline]
    pub fn segment_len_km(&self, segment: usize) -> f64 {
        self.segment_km[segment]
    }

    /// Total one-way length in kilometres.
    #[inline]
    pub fn total_km(&self) -> f64 {
        self.total_km
    }

    /// Start and end vertex of `segment`.
    pub fn segment(&self, segment: usize) -> SpatialResult<(GeoPoint, GeoPoint)> {
        if segment >= self.segment_count() {
            return Err(SpatialError::SegmentOutOfRange {
                route: self.route_id.clone(),
                segment,
                count: self.segment_count(),
            });
        }
        Ok((self.vertices[segment], self.vertices[segment + 1]))
    }

    /// Linear interpolation at `fraction` of the way from vertex `segment`
    /// to vertex `segment + 1`.  Out-of-range segments clamp to the last.
    pub fn interpolate(&self, segment: usize, fraction: f64) -> GeoPoint {
        let s = segment.min(self.last_segment());
        self.vertices[s].lerp(self.vertices[s + 1], fraction.clamp(0.0, 1.0))
    }
}
