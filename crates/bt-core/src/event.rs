//! `LocationEvent` — the record carried unchanged from the simulator through
//! the transport, the processor, and the fan-out channel.

use serde::{Deserialize, Serialize};

use crate::{GeoPoint, RouteId, VehicleId};

/// One position report for one vehicle.
///
/// Serialized as
/// `{ busId, routeId, latitude, longitude, speed, passengers, timestamp }`
/// with `timestamp` in epoch milliseconds.  Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationEvent {
    #[serde(rename = "busId")]
    pub vehicle_id: VehicleId,
    pub route_id:   RouteId,
    pub latitude:   f64,
    pub longitude:  f64,
    /// Current speed in km/h.
    pub speed:      f64,
    pub passengers: u32,
    /// Epoch milliseconds.
    pub timestamp:  i64,
}

impl LocationEvent {
    #[inline]
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Encode as the JSON wire payload.
    pub fn to_json(&self) -> Vec<u8> {
        // Infallible for this shape: plain numbers and strings.
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Decode a JSON wire payload.
    ///
    /// Rejects non-finite or out-of-range coordinates so a syntactically
    /// valid but nonsensical record is treated as malformed.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let event: LocationEvent = serde_json::from_slice(bytes)?;
        if !event.position().is_valid() || !event.speed.is_finite() {
            return Err(serde::de::Error::custom(format!(
                "coordinates out of range: {}",
                event.position()
            )));
        }
        Ok(event)
    }
}
