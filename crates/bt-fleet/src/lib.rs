//! `bt-fleet` — the Fleet Simulator.
//!
//! # Tick loop
//!
//! ```text
//! every tick_interval:
//!   ① now      = clock.now_ms()
//!   ② advance  — each vehicle moves by (now − last_update) of travel
//!                (parallel with the `parallel` feature)
//!   ③ emit     — one LocationEvent per vehicle, stamped `now`
//!   ④ publish  — one spawned task per event; the tick never waits on them,
//!                failures come back over a channel and are logged
//! ```
//!
//! # Cargo features
//!
//! | Feature    | Effect                                            |
//! |------------|---------------------------------------------------|
//! | `parallel` | Runs the advance phase on Rayon's thread pool.    |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! let mut fleet = FleetBuilder::new(routes, seed).vehicles_per_route(10).build()?;
//! let driver = FleetDriver::new(publisher, SystemClock, "bus-updates", Duration::from_secs(1));
//! driver.run(&mut fleet, &mut LogObserver::default(), shutdown_rx).await;
//! ```

pub mod builder;
pub mod driver;
pub mod error;
pub mod fleet;
pub mod observer;

#[cfg(test)]
mod tests;

pub use builder::FleetBuilder;
pub use driver::FleetDriver;
pub use error::{FleetError, FleetResult};
pub use fleet::{Fleet, SimVehicle};
pub use observer::{FleetObserver, LogObserver, NoopObserver};
