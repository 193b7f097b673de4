//! Per-vehicle motion state.

use std::sync::Arc;

use bt_core::{GeoPoint, LocationEvent, RouteId, VehicleId};
use bt_spatial::RoutePath;

use crate::{MotionError, MotionResult};

/// Travel direction along the route's vertex order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Direction {
    /// Vertex 0 toward the last vertex.
    #[default]
    Forward,
    /// Last vertex toward vertex 0.
    Reverse,
}

impl Direction {
    #[inline]
    pub fn flipped(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

/// The motion state of one simulated vehicle.
///
/// `segment` always lies in `[0, segment_count - 1]`.  `progress` is the
/// fraction of that segment already covered **in the direction of travel**,
/// in `[0.0, 1.0)`: moving forward it is measured from vertex `segment`,
/// moving in reverse from vertex `segment + 1`.  A vehicle standing on the
/// final vertex after a reversal is therefore `(last, 0.0, Reverse)`, never
/// an out-of-range segment.
#[derive(Debug, Clone)]
pub struct VehicleState {
    pub vehicle_id:       VehicleId,
    pub route_id:         RouteId,
    /// Shared, immutable route geometry.
    pub path:             Arc<RoutePath>,
    pub segment:          usize,
    pub progress:         f64,
    /// Current speed in km/h.
    pub speed_kmh:        f64,
    /// Speed the vehicle is easing toward, in km/h.
    pub target_speed_kmh: f64,
    pub passengers:       u32,
    pub direction:        Direction,
    /// Epoch milliseconds of the last advance.
    pub last_update_ms:   i64,
}

impl VehicleState {
    /// Construct a state, rejecting values that would break the walk.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vehicle_id:     VehicleId,
        path:           Arc<RoutePath>,
        segment:        usize,
        progress:       f64,
        speed_kmh:      f64,
        passengers:     u32,
        direction:      Direction,
        last_update_ms: i64,
    ) -> MotionResult<Self> {
        path.segment(segment)?;
        let invalid = |reason: String| MotionError::InvalidState {
            vehicle: vehicle_id.clone(),
            reason,
        };
        if !(0.0..1.0).contains(&progress) {
            return Err(invalid(format!("progress {progress} outside [0, 1)")));
        }
        if !(speed_kmh.is_finite() && speed_kmh > 0.0) {
            return Err(invalid(format!("speed {speed_kmh} km/h must be positive")));
        }

        Ok(Self {
            route_id: path.route_id.clone(),
            vehicle_id,
            path,
            segment,
            progress,
            speed_kmh,
            target_speed_kmh: speed_kmh,
            passengers,
            direction,
            last_update_ms,
        })
    }

    /// Interpolated position on the current segment.
    pub fn position(&self) -> GeoPoint {
        let fraction = match self.direction {
            Direction::Forward => self.progress,
            Direction::Reverse => 1.0 - self.progress,
        };
        self.path.interpolate(self.segment, fraction)
    }

    /// Snapshot the state as a wire event stamped `timestamp_ms`.
    pub fn to_event(&self, timestamp_ms: i64) -> LocationEvent {
        let p = self.position();
        LocationEvent {
            vehicle_id: self.vehicle_id.clone(),
            route_id:   self.route_id.clone(),
            latitude:   p.lat,
            longitude:  p.lon,
            speed:      self.speed_kmh,
            passengers: self.passengers,
            timestamp:  timestamp_ms,
        }
    }
}
