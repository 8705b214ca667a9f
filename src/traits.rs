//! Core capability traits for the proximity pipeline.
//!
//! Kept minimal so tests and alternative backends can plug in their own
//! destinations and routing services.

use crate::error::RoutingError;
use crate::model::GeoPoint;
use crate::routing::Route;

/// Something the candidate selector and task planner can place on a map.
pub trait Located {
    /// Point used for the straight-line prefilter (own point or centroid).
    fn representative_point(&self) -> GeoPoint;

    /// Point handed to the routing backend for a trip from `origin`.
    fn routable_point(&self, origin: GeoPoint) -> GeoPoint;

    /// Whether the destination passes its category filter.
    fn is_eligible(&self) -> bool {
        true
    }
}

impl<T: Located + ?Sized> Located for &T {
    fn representative_point(&self) -> GeoPoint {
        (**self).representative_point()
    }

    fn routable_point(&self, origin: GeoPoint) -> GeoPoint {
        (**self).routable_point(origin)
    }

    fn is_eligible(&self) -> bool {
        (**self).is_eligible()
    }
}

/// Computes a single-leg walking route between two points.
///
/// Implementations are shared across worker threads and must not keep
/// per-request state.
pub trait RouteProvider: Sync {
    fn route(&self, origin: GeoPoint, destination: GeoPoint) -> Result<Route, RoutingError>;
}

impl<P: RouteProvider + ?Sized> RouteProvider for &P {
    fn route(&self, origin: GeoPoint, destination: GeoPoint) -> Result<Route, RoutingError> {
        (**self).route(origin, destination)
    }
}
