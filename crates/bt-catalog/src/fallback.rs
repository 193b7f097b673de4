//! Built-in routes used when no catalog file is configured.

use bt_core::{GeoPoint, Route};

use crate::CatalogResult;

/// (id, name, color, [(longitude, latitude)])
type RouteSpec = (&'static str, &'static str, &'static str, &'static [(f64, f64)]);

const FALLBACK: [RouteSpec; 3] = [
    (
        "1",
        "Majestic - Indiranagar",
        "#FF0000",
        &[
            (77.5702, 12.9779),
            (77.5843, 12.9754),
            (77.6078, 12.9744),
            (77.6186, 12.9740),
            (77.6408, 12.9784),
        ],
    ),
    (
        "2",
        "Majestic - Silk Board",
        "#0000FF",
        &[
            (77.5702, 12.9779),
            (77.5794, 12.9642),
            (77.5954, 12.9647),
            (77.6071, 12.9431),
            (77.6322, 12.9255),
            (77.6233, 12.9175),
        ],
    ),
    (
        "3",
        "ORR - Marathahalli to Hebbal",
        "#00FF00",
        &[
            (77.7044, 12.9520),
            (77.6830, 12.9912),
            (77.6715, 13.0112),
            (77.6200, 13.0450),
            (77.5900, 13.0350),
        ],
    ),
];

/// The three static Bangalore routes.
pub fn fallback_routes() -> CatalogResult<Vec<Route>> {
    FALLBACK
        .iter()
        .map(|&(id, name, color, coords)| {
            let vertices = coords.iter().map(|&(lon, lat)| GeoPoint::from_lon_lat(lon, lat)).collect();
            Route::new(id, name, color, vertices).map_err(Into::into)
        })
        .collect()
}
