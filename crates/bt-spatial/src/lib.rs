//! `bt-spatial` — route geometry, vehicle spatial index, and grid cells.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                    |
//! |-------------|-------------------------------------------------------------|
//! | [`path`]    | `RoutePath` — vertices plus precomputed segment lengths     |
//! | [`index`]   | `VehicleIndex` (R-tree with per-vehicle upsert), `Neighbor` |
//! | [`grid`]    | `GridSpec`, `GridCell` — quantized lat/lon buckets          |
//! | [`error`]   | `SpatialError`, `SpatialResult<T>`                          |

pub mod error;
pub mod grid;
pub mod index;
pub mod path;


pub use error::{SpatialError, SpatialResult};
pub use grid::{GridCell, GridSpec};
pub use index::{Neighbor, VehicleIndex};
pub use path::RoutePath;
