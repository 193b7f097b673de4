//! `bt-core` — foundational types for the bus-tracker live pipeline.
//!
//! This crate is a dependency of every other `bt-*` crate.  It has no `bt-*`
//! dependencies and only small external ones (`rand`, `thiserror`, `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `VehicleId`, `RouteId`                                |
//! | [`geo`]         | `GeoPoint`, haversine distance, `BoundingBox`         |
//! | [`time`]        | `Tick`, `Clock`, `SystemClock`, `ManualClock`         |
//! | [`rng`]         | `VehicleRng` (per-vehicle, seed-mixed)                |
//! | [`event`]       | `LocationEvent` — the wire record                     |
//! | [`route`]       | `Route` — validated, immutable polyline               |
//! | [`config`]      | `PipelineConfig` — environment-style settings         |
//! | [`error`]       | `BtError`, `BtResult`                                 |

pub mod config;
pub mod error;
pub mod event;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod route;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::PipelineConfig;
pub use error::{BtError, BtResult};
pub use event::LocationEvent;
pub use geo::{BoundingBox, GeoPoint};
pub use ids::{RouteId, VehicleId};
pub use rng::VehicleRng;
pub use route::Route;
pub use time::{Clock, ManualClock, SystemClock, Tick};
