//! `bt-motion` — vehicle motion along a route polyline.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                      |
//! |-------------|---------------------------------------------------------------|
//! | [`state`]   | `VehicleState`, `Direction`                                   |
//! | [`model`]   | `MotionModel`, `MotionParams`, `Step` — the per-tick advance  |
//! | [`error`]   | `MotionError`, `MotionResult<T>`                              |
//!
//! # Movement model (shuttle along a polyline)
//!
//! 1. Speed drifts toward a target that is occasionally re-rolled; the
//!    actual speed closes a fixed fraction of the gap each tick.
//! 2. The tick's distance budget (`speed / 3600 × elapsed`) is consumed
//!    segment by segment in the direction of travel.
//! 3. Reaching either end of the route flips the direction; the remaining
//!    budget is spent heading back the other way.
//! 4. Passenger counts change at every reversal and, with some probability,
//!    at each interior vertex (a virtual stop).
//!
//! `advance` is pure computation over one `VehicleState` and a caller-owned
//! random source: no I/O, no shared state, never suspends.

pub mod error;
pub mod model;
pub mod state;

#[cfg(test)]
mod tests;

pub use error::{MotionError, MotionResult};
pub use model::{MotionModel, MotionParams, Step};
pub use state::{Direction, VehicleState};
