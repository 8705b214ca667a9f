//! Polyline representation for route geometries.
//!
//! Routes arrive from the routing service as GeoJSON `LineString`s and are
//! written back out in the same form; in between they are kept as decoded
//! (latitude, longitude) points.

use serde::{Deserialize, Serialize};

/// A polyline representing a route geometry as decoded coordinates.
///
/// (De)serialises as a GeoJSON `LineString` with `[lon, lat]` positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GeoJsonLineString", into = "GeoJsonLineString")]
pub struct Polyline {
    points: Vec<(f64, f64)>,
}

impl Polyline {
    /// Each point is a (latitude, longitude) tuple.
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn into_points(self) -> Vec<(f64, f64)> {
        self.points
    }

    /// Serialises the polyline as a compact GeoJSON string.
    pub fn to_geojson(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeoJsonLineString {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Vec<Vec<f64>>,
}

impl TryFrom<GeoJsonLineString> for Polyline {
    type Error = String;

    fn try_from(value: GeoJsonLineString) -> Result<Self, Self::Error> {
        if value.kind != "LineString" {
            return Err(format!("expected LineString geometry, got {}", value.kind));
        }
        let points = value
            .coordinates
            .into_iter()
            .map(|position| match position.as_slice() {
                [lon, lat, ..] => Ok((*lat, *lon)),
                _ => Err("position needs at least two values".to_string()),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Polyline::new(points))
    }
}

impl From<Polyline> for GeoJsonLineString {
    fn from(polyline: Polyline) -> Self {
        Self {
            kind: "LineString".to_string(),
            coordinates: polyline
                .into_points()
                .into_iter()
                .map(|(lat, lon)| vec![lon, lat])
                .collect(),
        }
    }
}
