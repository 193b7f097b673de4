//! `Route` — a named, colored polyline that vehicles shuttle along.

use std::sync::Arc;

use crate::{BtError, BtResult, GeoPoint, RouteId};

/// An immutable route loaded from the catalog.
///
/// Construct through [`Route::new`], which enforces the invariants the motion
/// model relies on: at least two vertices, every vertex a valid WGS-84
/// coordinate, and a strictly positive total length.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub id:    RouteId,
    pub name:  String,
    /// Display color, e.g. `#FF0000`.
    pub color: String,
    vertices:  Arc<[GeoPoint]>,
}

impl Route {
    pub fn new(
        id:       impl Into<RouteId>,
        name:     impl Into<String>,
        color:    impl Into<String>,
        vertices: Vec<GeoPoint>,
    ) -> BtResult<Self> {
        let id = id.into();
        let invalid = |reason: String| BtError::InvalidRoute { route: id.clone(), reason };

        if vertices.len() < 2 {
            return Err(invalid(format!("needs at least 2 vertices, got {}", vertices.len())));
        }
        if let Some((i, p)) = vertices.iter().enumerate().find(|(_, p)| !p.is_valid()) {
            return Err(invalid(format!("vertex {i} {p} is not a valid coordinate")));
        }
        let length_km: f64 = vertices.windows(2).map(|w| w[0].distance_km(w[1])).sum();
        if length_km <= 0.0 {
            return Err(invalid("total length is zero".to_string()));
        }

        Ok(Self {
            id,
            name: name.into(),
            color: color.into(),
            vertices: vertices.into(),
        })
    }

    /// Ordered vertices of the polyline.
    #[inline]
    pub fn vertices(&self) -> &[GeoPoint] {
        &self.vertices
    }

    /// Shared handle to the vertex sequence.
    #[inline]
    pub fn shared_vertices(&self) -> Arc<[GeoPoint]> {
        Arc::clone(&self.vertices)
    }

    /// Number of segments (`vertices - 1`).
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.vertices.len() - 1
    }
}
