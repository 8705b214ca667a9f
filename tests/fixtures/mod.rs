//! Test fixtures for walkreach.
//!
//! Provides:
//! - Approximate Brandenburg an der Havel locations
//! - Stub routing backends and builders for addresses and destinations

#![allow(dead_code)]

pub mod brandenburg_locations;

pub use brandenburg_locations::*;

use std::sync::atomic::{AtomicUsize, Ordering};

use geo::{Coord, LineString, MultiPolygon, Polygon};
use walkreach::error::RoutingError;
use walkreach::haversine::{EARTH_RADIUS_M, haversine_m};
use walkreach::model::{
    Address, AddressId, AreaDestination, Destination, DestinationId, GeoPoint, PointDestination,
};
use walkreach::projection::Utm;
use walkreach::routing::Route;
use walkreach::traits::RouteProvider;

/// Routing backend driven by a closure.
pub struct StubRouter<F> {
    handler: F,
    calls: AtomicUsize,
}

impl<F> StubRouter<F>
where
    F: Fn(GeoPoint, GeoPoint) -> Result<Route, RoutingError> + Sync,
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<F> RouteProvider for StubRouter<F>
where
    F: Fn(GeoPoint, GeoPoint) -> Result<Route, RoutingError> + Sync,
{
    fn route(&self, origin: GeoPoint, destination: GeoPoint) -> Result<Route, RoutingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.handler)(origin, destination)
    }
}

/// Walking distance equal to the straight line, no geometry.
pub fn straight_line(origin: GeoPoint, destination: GeoPoint) -> Result<Route, RoutingError> {
    Ok(Route {
        distance_m: haversine_m(origin, destination),
        geometry: None,
    })
}

pub fn network_down() -> RoutingError {
    RoutingError::Network {
        message: "connection refused".to_string(),
    }
}

pub fn point(lat: f64, lon: f64) -> GeoPoint {
    GeoPoint::new(lat, lon).expect("valid fixture coordinates")
}

/// Point `meters` due north of `origin` (negative goes south).
pub fn north_of(origin: GeoPoint, meters: f64) -> GeoPoint {
    point(origin.lat + (meters / EARTH_RADIUS_M).to_degrees(), origin.lon)
}

pub fn address(id: usize, at: GeoPoint) -> Address {
    Address {
        id: AddressId(id),
        point: at,
        attributes: Vec::new(),
    }
}

pub fn point_destination(id: &str, at: GeoPoint) -> Destination {
    Destination::Point(PointDestination {
        id: DestinationId::new(id),
        point: at,
        eligible: None,
    })
}

pub fn flagged_destination(id: &str, at: GeoPoint, eligible: bool) -> Destination {
    Destination::Point(PointDestination {
        id: DestinationId::new(id),
        point: at,
        eligible: Some(eligible),
    })
}

/// Square area of `side_m` meters centred on `center`, in the default UTM
/// zone.
pub fn square_area(id: &str, center: GeoPoint, side_m: f64) -> Destination {
    let projection = Utm::default();
    let c = projection.forward(center).expect("center inside zone");
    let h = side_m / 2.0;
    let ring = LineString::new(vec![
        Coord { x: c.x - h, y: c.y - h },
        Coord { x: c.x + h, y: c.y - h },
        Coord { x: c.x + h, y: c.y + h },
        Coord { x: c.x - h, y: c.y + h },
        Coord { x: c.x - h, y: c.y - h },
    ]);
    Destination::Area(AreaDestination {
        id: DestinationId::new(id),
        geometry: MultiPolygon::new(vec![Polygon::new(ring, vec![])]),
        projection,
        centroid: center,
    })
}
