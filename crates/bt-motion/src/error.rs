use bt_core::VehicleId;
use bt_spatial::SpatialError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MotionError {
    #[error("vehicle {vehicle}: {reason}")]
    InvalidState { vehicle: VehicleId, reason: String },

    #[error("route geometry: {0}")]
    Spatial(#[from] SpatialError),
}

pub type MotionResult<T> = Result<T, MotionError>;
