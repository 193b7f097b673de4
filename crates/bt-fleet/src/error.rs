use bt_core::RouteId;
use bt_motion::MotionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("fleet needs at least one route")]
    NoRoutes,

    #[error("fleet needs at least one vehicle")]
    ZeroVehicles,

    #[error("route id {0} appears more than once")]
    DuplicateRoute(RouteId),

    #[error("vehicle placement failed: {0}")]
    Motion(#[from] MotionError),
}

pub type FleetResult<T> = Result<T, FleetError>;
