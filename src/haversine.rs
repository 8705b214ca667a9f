//! Haversine (great-circle) distances.
//!
//! Straight-line, not walking distance. Used to shrink candidate sets and as
//! a degraded estimate when the routing service is unavailable; never the
//! reported answer when a network distance exists.

use crate::error::RoutingError;
use crate::model::GeoPoint;
use crate::routing::Route;
use crate::traits::RouteProvider;

/// Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters.
pub fn haversine_m(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lon = (to.lon - from.lon).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Route provider that answers with the straight-line distance.
///
/// Stands in for the routing service on offline runs. Routes carry no
/// geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct HaversineEstimator;

impl RouteProvider for HaversineEstimator {
    fn route(&self, origin: GeoPoint, destination: GeoPoint) -> Result<Route, RoutingError> {
        if !origin.is_valid() || !destination.is_valid() {
            return Err(RoutingError::InvalidCoordinates);
        }

        Ok(Route {
            distance_m: haversine_m(origin, destination),
            geometry: None,
        })
    }
}
