//! Route catalog loaders.
//!
//! # CSV format
//!
//! One row per vertex.  Rows of a route may be interleaved with other routes
//! and appear in any order; `seq` fixes the vertex order.  `name` and
//! `color` are taken from the first row of each route.
//!
//! ```csv
//! route_id,name,color,seq,longitude,latitude
//! 1,Majestic - Indiranagar,#FF0000,0,77.5702,12.9779
//! 1,Majestic - Indiranagar,#FF0000,1,77.5843,12.9754
//! ```
//!
//! # JSON format
//!
//! An array of route objects with a GeoJSON `LineString` path:
//!
//! ```json
//! [{ "id": "1", "name": "Majestic - Indiranagar", "color": "#FF0000",
//!    "path": { "type": "LineString", "coordinates": [[77.5702, 12.9779], [77.5843, 12.9754]] } }]
//! ```
//!
//! `color` is optional and defaults to `#000000`.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use bt_core::{GeoPoint, Route};

use crate::{CatalogError, CatalogResult};

const DEFAULT_COLOR: &str = "#000000";

// ── Records ───────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct VertexRecord {
    route_id:  String,
    name:      String,
    color:     String,
    seq:       u32,
    longitude: f64,
    latitude:  f64,
}

#[derive(Deserialize)]
struct RouteRecord {
    id:    String,
    name:  String,
    #[serde(default)]
    color: Option<String>,
    path:  LineString,
}

#[derive(Deserialize)]
struct LineString {
    #[serde(rename = "type")]
    kind:        String,
    coordinates: Vec<[f64; 2]>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load a catalog file, choosing the format from its extension.
pub fn load_routes(path: &Path) -> CatalogResult<Vec<Route>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => load_routes_csv(path),
        "json" => load_routes_json(path),
        _ => Err(CatalogError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Load routes from a CSV file.
pub fn load_routes_csv(path: &Path) -> CatalogResult<Vec<Route>> {
    let file = std::fs::File::open(path)?;
    load_routes_reader(file)
}

/// Like [`load_routes_csv`] but accepts any `Read` source.
pub fn load_routes_reader<R: Read>(reader: R) -> CatalogResult<Vec<Route>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut order: Vec<String> = Vec::new();
    let mut by_route: HashMap<String, Vec<VertexRecord>> = HashMap::new();

    for result in csv_reader.deserialize::<VertexRecord>() {
        let row = result.map_err(|e| CatalogError::Parse(e.to_string()))?;
        if !by_route.contains_key(&row.route_id) {
            order.push(row.route_id.clone());
        }
        by_route.entry(row.route_id.clone()).or_default().push(row);
    }

    let mut routes = Vec::with_capacity(order.len());
    for id in order {
        let Some(mut rows) = by_route.remove(&id) else { continue };
        rows.sort_by_key(|r| r.seq);
        if let Some(w) = rows.windows(2).find(|w| w[0].seq == w[1].seq) {
            return Err(CatalogError::Parse(format!("route {id:?} repeats seq {}", w[0].seq)));
        }
        let name = rows[0].name.clone();
        let color = rows[0].color.clone();
        let vertices = rows.iter().map(|r| GeoPoint::from_lon_lat(r.longitude, r.latitude)).collect();
        routes.push(Route::new(id, name, color, vertices)?);
    }

    non_empty(routes)
}

/// Load routes from a JSON file.
pub fn load_routes_json(path: &Path) -> CatalogResult<Vec<Route>> {
    let file = std::fs::File::open(path)?;
    load_routes_json_reader(std::io::BufReader::new(file))
}

/// Like [`load_routes_json`] but accepts any `Read` source.
pub fn load_routes_json_reader<R: Read>(reader: R) -> CatalogResult<Vec<Route>> {
    let records: Vec<RouteRecord> =
        serde_json::from_reader(reader).map_err(|e| CatalogError::Parse(e.to_string()))?;

    let routes = records
        .into_iter()
        .map(|r| {
            if r.path.kind != "LineString" {
                return Err(CatalogError::Parse(format!(
                    "route {:?}: path type {:?}, expected \"LineString\"",
                    r.id, r.path.kind
                )));
            }
            let vertices = r.path.coordinates.iter().map(|&[lon, lat]| GeoPoint::from_lon_lat(lon, lat)).collect();
            let color = r.color.unwrap_or_else(|| DEFAULT_COLOR.to_string());
            Ok(Route::new(r.id, r.name, color, vertices)?)
        })
        .collect::<CatalogResult<Vec<_>>>()?;

    non_empty(routes)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn non_empty(routes: Vec<Route>) -> CatalogResult<Vec<Route>> {
    if routes.is_empty() {
        return Err(CatalogError::Empty);
    }
    Ok(routes)
}
