//! `bt-processor` — the Stream Processor.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                   |
//! |----------------|------------------------------------------------------------|
//! | [`store`]      | `PositionStore` trait, `MemoryStore` (latest + index + density) |
//! | [`density`]    | `DensityGrid` — per-cell counters with a sliding TTL       |
//! | [`processor`]  | `StreamProcessor` — per-message handler and worker loop    |
//! | [`query`]      | `QueryView` — read-only lookups for an API layer           |
//! | [`stats`]      | `ProcessorStats` counters                                  |
//! | [`error`]      | `ProcessorError`, `StoreError`                             |
//!
//! # Per-message steps
//!
//! ```text
//! parse      → malformed payloads are logged and dropped
//! ① latest   → LatestPosition[vehicle] = event             (overwrite)
//! ② index    → SpatialIndex[vehicle]   = (lat, lon)        (overwrite)
//! ③ density  → cell(lat, lon) += 1, expiry = now + ttl     (counts duplicates)
//! ④ publish  → the event goes out on the fan-out topic
//! ack        → only after all four steps ran
//! ```
//!
//! A failing store step is logged and the remaining steps still run, so live
//! observers keep receiving events while aggregates lag.

pub mod density;
pub mod error;
pub mod processor;
pub mod query;
pub mod stats;
pub mod store;


pub use density::DensityGrid;
pub use error::{ProcessorError, StoreError, StoreResult};
pub use processor::{run_density_sweep, Outcome, StreamProcessor};
pub use query::QueryView;
pub use stats::{ProcessorStats, StatsSnapshot};
pub use store::{MemoryStore, PositionStore};
