//! `bt-fanout` — the Fan-out Bridge.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                       |
//! |--------------|----------------------------------------------------------------|
//! | [`hub`]      | `FanoutHub` — `tokio::sync::broadcast` over `Arc<LocationEvent>` |
//! | [`bridge`]   | `FanoutBridge` — subscription → hub                            |
//! | [`server`]   | `ObserverServer` — WebSocket text frames or NDJSON lines, per-connection task |
//! | [`error`]    | `FanoutError`, `FanoutResult<T>`                               |
//!
//! # Delivery model
//!
//! The bridge pushes every processed event into the hub exactly once and
//! never waits on observers.  Each observer connection runs in its own task
//! with its own receiver: a slow observer falls behind, skips what the hub
//! no longer holds and carries on with newer events, while the others are
//! unaffected.  Observers only see events published after they connect.

pub mod bridge;
pub mod error;
pub mod hub;
pub mod server;


pub use bridge::FanoutBridge;
pub use error::{FanoutError, FanoutResult};
pub use hub::FanoutHub;
pub use server::{ObserverProtocol, ObserverServer, SessionEnd, SessionReport};
