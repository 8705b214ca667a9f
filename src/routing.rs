//! Routing tasks and their results.
//!
//! [`route_distance`] is the boundary where backend failures stop: whatever
//! the provider does, the caller gets a [`RoutingResult`] whose distance is
//! present or absent.

use tracing::warn;

use crate::haversine::haversine_m;
use crate::model::{AddressId, DestinationId, GeoPoint};
use crate::polyline::Polyline;
use crate::traits::RouteProvider;

/// A successful route from the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub distance_m: f64,
    pub geometry: Option<Polyline>,
}

/// One (address, destination) pair to route. Consumed exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingTask {
    pub origin_id: AddressId,
    pub destination_id: DestinationId,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
}

/// What to report when the routing backend fails for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnRoutingFailure {
    /// Leave the distance absent.
    #[default]
    Absent,
    /// Substitute the haversine distance and leave the geometry absent.
    HaversineEstimate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceSource {
    Network,
    HaversineEstimate,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutingResult {
    pub origin_id: AddressId,
    pub destination_id: DestinationId,
    pub distance_m: Option<f64>,
    pub geometry: Option<Polyline>,
    pub source: DistanceSource,
}

/// Routes one task, absorbing every backend failure.
///
/// Invalid coordinates short-circuit without calling the provider and are
/// never estimated.
pub fn route_distance<P: RouteProvider + ?Sized>(
    provider: &P,
    task: RoutingTask,
    on_failure: OnRoutingFailure,
) -> RoutingResult {
    let RoutingTask {
        origin_id,
        destination_id,
        origin,
        destination,
    } = task;

    if !origin.is_valid() || !destination.is_valid() {
        warn!(
            address = %origin_id,
            destination = %destination_id,
            "skipping routing task with invalid coordinates"
        );
        return RoutingResult {
            origin_id,
            destination_id,
            distance_m: None,
            geometry: None,
            source: DistanceSource::Unavailable,
        };
    }

    let (distance_m, geometry, source) = match provider.route(origin, destination) {
        Ok(route) => (Some(route.distance_m), route.geometry, DistanceSource::Network),
        Err(err) => {
            warn!(
                address = %origin_id,
                destination = %destination_id,
                from_lat = origin.lat,
                from_lon = origin.lon,
                to_lat = destination.lat,
                to_lon = destination.lon,
                error = %err,
                "routing request failed"
            );
            match on_failure {
                OnRoutingFailure::Absent => (None, None, DistanceSource::Unavailable),
                OnRoutingFailure::HaversineEstimate => (
                    Some(haversine_m(origin, destination)),
                    None,
                    DistanceSource::HaversineEstimate,
                ),
            }
        }
    };

    RoutingResult {
        origin_id,
        destination_id,
        distance_m,
        geometry,
        source,
    }
}
