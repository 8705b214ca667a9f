//! Typed records for addresses, destinations and per-address aggregates.
//!
//! Records are built once at load time; the routing pipeline only reads them.

use std::fmt;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

use crate::entry_point;
use crate::polyline::Polyline;
use crate::projection::Utm;
use crate::traits::Located;

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Builds a point, rejecting non-finite or out-of-range coordinates.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let point = Self { lat, lon };
        point.is_valid().then_some(point)
    }

    /// Builds a point from optional columns; either side missing yields `None`.
    pub fn from_parts(lat: Option<f64>, lon: Option<f64>) -> Option<Self> {
        Self::new(lat?, lon?)
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Position of an address in the loaded address table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AddressId(pub usize);

impl fmt::Display for AddressId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DestinationId(pub String);

impl DestinationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A geocoded address. `attributes` holds the untouched source columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub id: AddressId,
    pub point: GeoPoint,
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointDestination {
    pub id: DestinationId,
    pub point: GeoPoint,
    /// Category flag such as "is a medical center". `None` when the source
    /// carries no flag, which makes the destination eligible.
    pub eligible: Option<bool>,
}

/// A polygonal destination kept in a projected (metric) frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaDestination {
    pub id: DestinationId,
    pub geometry: MultiPolygon<f64>,
    pub projection: Utm,
    /// Centroid of `geometry`, reprojected to WGS84.
    pub centroid: GeoPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    Point(PointDestination),
    Area(AreaDestination),
}

impl Destination {
    pub fn id(&self) -> &DestinationId {
        match self {
            Destination::Point(point) => &point.id,
            Destination::Area(area) => &area.id,
        }
    }

    pub fn is_area(&self) -> bool {
        matches!(self, Destination::Area(_))
    }
}

impl Located for Destination {
    fn representative_point(&self) -> GeoPoint {
        match self {
            Destination::Point(point) => point.point,
            Destination::Area(area) => area.centroid,
        }
    }

    fn routable_point(&self, origin: GeoPoint) -> GeoPoint {
        match self {
            Destination::Point(point) => point.point,
            Destination::Area(area) => {
                entry_point::resolve(origin, &area.geometry, &area.projection, area.centroid)
            }
        }
    }

    fn is_eligible(&self) -> bool {
        match self {
            Destination::Point(point) => point.eligible.unwrap_or(true),
            Destination::Area(_) => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdCount {
    pub threshold_m: f64,
    pub count: usize,
}

/// Per-address aggregate over every destination that produced a distance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregateRow {
    pub nearest_m: Option<f64>,
    pub nearest_route: Option<Polyline>,
    pub nearest_destination: Option<DestinationId>,
    pub counts: Vec<ThresholdCount>,
}

impl AggregateRow {
    pub fn count_within(&self, threshold_m: f64) -> Option<usize> {
        self.counts
            .iter()
            .find(|entry| entry.threshold_m == threshold_m)
            .map(|entry| entry.count)
    }
}
