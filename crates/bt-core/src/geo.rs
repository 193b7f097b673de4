//! Geographic coordinate type and spatial utilities.
//!
//! `GeoPoint` uses `f64` latitude/longitude.  Density cells are quantized at
//! 1e-3 degree; `f32` rounding at city longitudes (~77.57) is too coarse for
//! that.

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Approximate length of one degree of latitude, in kilometres.
pub const KM_PER_DEGREE_LAT: f64 = 111.195;

/// A WGS-84 geographic coordinate.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[inline]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build from a `(longitude, latitude)` pair, the vertex order used by
    /// route catalogs.
    #[inline]
    pub fn from_lon_lat(lon: f64, lat: f64) -> Self {
        Self { lat, lon }
    }

    /// Haversine great-circle distance in kilometres.
    pub fn distance_km(self, other: GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_KM * c
    }

    /// Planar interpolation between `self` and `other`.  `t = 0` is `self`,
    /// `t = 1` is `other`.  Not geodesic: adequate at sub-kilometre scale.
    #[inline]
    pub fn lerp(self, other: GeoPoint, t: f64) -> GeoPoint {
        GeoPoint {
            lat: self.lat + (other.lat - self.lat) * t,
            lon: self.lon + (other.lon - self.lon) * t,
        }
    }

    /// `true` if both components are finite and within WGS-84 bounds.
    pub fn is_valid(self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

// ── BoundingBox ───────────────────────────────────────────────────────────────

/// An axis-aligned lat/lon rectangle, inclusive on all edges.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    pub min: GeoPoint,
    pub max: GeoPoint,
}

impl BoundingBox {
    /// Build from any two opposite corners.
    pub fn from_corners(a: GeoPoint, b: GeoPoint) -> Self {
        Self {
            min: GeoPoint::new(a.lat.min(b.lat), a.lon.min(b.lon)),
            max: GeoPoint::new(a.lat.max(b.lat), a.lon.max(b.lon)),
        }
    }

    /// The smallest box containing every point within `radius_km` of
    /// `center`.  The longitude span widens with latitude.
    pub fn around(center: GeoPoint, radius_km: f64) -> Self {
        let d_lat = radius_km / KM_PER_DEGREE_LAT;
        let cos_lat = center.lat.to_radians().cos().abs().max(1e-6);
        let d_lon = (radius_km / (KM_PER_DEGREE_LAT * cos_lat)).min(180.0);
        Self {
            min: GeoPoint::new(center.lat - d_lat, center.lon - d_lon),
            max: GeoPoint::new(center.lat + d_lat, center.lon + d_lon),
        }
    }

    #[inline]
    pub fn contains(&self, p: GeoPoint) -> bool {
        (self.min.lat..=self.max.lat).contains(&p.lat)
            && (self.min.lon..=self.max.lon).contains(&p.lon)
    }
}
