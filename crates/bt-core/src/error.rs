//! Pipeline-wide error type.
//!
//! Sub-crates define their own error enums and wrap `BtError` as one variant
//! where they need to surface core validation failures.

use thiserror::Error;

use crate::RouteId;

/// The top-level error type for `bt-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum BtError {
    #[error("route {route} is invalid: {reason}")]
    InvalidRoute { route: RouteId, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for all `bt-*` crates.
pub type BtResult<T> = Result<T, BtError>;
