//! Quantized lat/lon grid used by the density aggregate.
//!
//! A cell is `(floor(lat * k), floor(lon * k))` for `k` cells per degree.
//! At the default `k = 1000` a cell spans 0.001° on each axis, roughly
//! 110 m × 110 m near the equator.

use bt_core::{BoundingBox, GeoPoint};

/// Grid key: quantized latitude and longitude.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct GridCell {
    pub lat: i32,
    pub lon: i32,
}

impl GridCell {
    #[inline]
    pub fn new(lat: i32, lon: i32) -> Self {
        Self { lat, lon }
    }
}

impl std::fmt::Display for GridCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.lat, self.lon)
    }
}

/// Grid resolution.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct GridSpec {
    pub cells_per_degree: u32,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self { cells_per_degree: 1_000 }
    }
}

impl GridSpec {
    pub fn new(cells_per_degree: u32) -> Self {
        Self { cells_per_degree: cells_per_degree.max(1) }
    }

    /// The cell containing `p`.
    #[inline]
    pub fn cell(&self, p: GeoPoint) -> GridCell {
        let k = self.cells_per_degree as f64;
        GridCell {
            lat: (p.lat * k).floor() as i32,
            lon: (p.lon * k).floor() as i32,
        }
    }

    /// South-west corner of `cell`.
    pub fn origin(&self, cell: GridCell) -> GeoPoint {
        let k = self.cells_per_degree as f64;
        GeoPoint::new(cell.lat as f64 / k, cell.lon as f64 / k)
    }

    /// `true` if any part of `cell` overlaps `bbox`.
    pub fn intersects(&self, cell: GridCell, bbox: &BoundingBox) -> bool {
        let lo = self.cell(bbox.min);
        let hi = self.cell(bbox.max);
        (lo.lat..=hi.lat).contains(&cell.lat) && (lo.lon..=hi.lon).contains(&cell.lon)
    }
}
