//! Strongly typed identifier wrappers.
//!
//! Vehicle and route identifiers travel over the wire as plain JSON strings,
//! so the wrappers are `#[serde(transparent)]`.  The inner value is an
//! `Arc<str>`, shared by every event, store key and index entry that
//! carries it.

use std::fmt;
use std::sync::Arc;

/// Generate a typed ID wrapper around a shared string.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[derive(serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        $vis struct $name(Arc<str>);

        impl $name {
            pub fn new(id: impl AsRef<str>) -> Self {
                Self(Arc::from(id.as_ref()))
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(Arc::from(s))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

typed_id! {
    /// Identifier of a simulated vehicle, e.g. `bus-0001-3`.
    pub struct VehicleId;
}

typed_id! {
    /// Identifier of a route in the external catalog.
    pub struct RouteId;
}

impl VehicleId {
    /// Compose the id of the vehicle occupying `slot` on `route`.
    ///
    /// The route part is the first four characters of the route id,
    /// left-padded with `0`, so route `"1"` slot 3 becomes `bus-0001-3`.
    pub fn for_slot(route: &RouteId, slot: usize) -> Self {
        let prefix: String = route.as_str().chars().take(4).collect();
        Self::from(format!("bus-{prefix:0>4}-{slot}"))
    }
}
