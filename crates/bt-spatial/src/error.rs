//! Spatial-subsystem error type.

use thiserror::Error;

use bt_core::RouteId;

/// Errors produced by `bt-spatial`.
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("segment {segment} out of range for route {route} ({count} segments)")]
    SegmentOutOfRange {
        route:   RouteId,
        segment: usize,
        count:   usize,
    },
}

pub type SpatialResult<T> = Result<T, SpatialError>;
