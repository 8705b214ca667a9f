//! Representative entry points for area destinations.
//!
//! An area is routed to via the point on its boundary closest to the origin.
//! Every failure along the way degrades to the precomputed centroid, so
//! [`resolve`] always yields a point.

use geo::{
    Area, Buffer, Closest, ClosestPoint, Coord, Euclidean, InterpolatableLine, LineLocatePoint,
    LineString, MultiPolygon, Point, Polygon, Validation,
};
use thiserror::Error;
use tracing::debug;

use crate::model::GeoPoint;
use crate::projection::{ProjectionError, Utm};

#[derive(Debug, Error)]
enum EntryPointError {
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error("geometry has no part with positive area")]
    EmptyGeometry,
    #[error("no point on the boundary or surface could be located")]
    NoClosestPoint,
}

/// Returns the routable entry point of `area` as seen from `origin`.
///
/// `area` is expressed in `projection`'s planar frame. Multi-part areas are
/// reduced to their largest part, invalid parts are repaired with a
/// zero-distance buffer, and the origin is projected onto the boundary.
/// Falls back to `centroid` whenever no finite boundary point is found.
pub fn resolve(
    origin: GeoPoint,
    area: &MultiPolygon<f64>,
    projection: &Utm,
    centroid: GeoPoint,
) -> GeoPoint {
    match boundary_entry(origin, area, projection) {
        Ok(entry) => entry,
        Err(reason) => {
            debug!(
                lat = origin.lat,
                lon = origin.lon,
                %reason,
                "entry point falls back to centroid"
            );
            centroid
        }
    }
}

fn boundary_entry(
    origin: GeoPoint,
    area: &MultiPolygon<f64>,
    projection: &Utm,
) -> Result<GeoPoint, EntryPointError> {
    let origin_m = Point::from(projection.forward(origin)?);

    let main = largest_part(area.iter()).ok_or(EntryPointError::EmptyGeometry)?;
    let shape = if main.is_valid() {
        main.clone()
    } else {
        let repaired = main.buffer(0.0);
        largest_part(repaired.iter()).cloned().unwrap_or_else(|| main.clone())
    };
    if !(shape.unsigned_area() > 0.0) {
        return Err(EntryPointError::EmptyGeometry);
    }

    let entry_m = closest_on_boundary(&shape, origin_m)
        .or_else(|| closest_on_surface(&shape, origin_m))
        .ok_or(EntryPointError::NoClosestPoint)?;

    Ok(projection.inverse(entry_m.0)?)
}

/// Part with the largest area, ignoring parts without a closed exterior.
fn largest_part<'a>(parts: impl Iterator<Item = &'a Polygon<f64>>) -> Option<&'a Polygon<f64>> {
    parts
        .filter(|part| part.exterior().0.len() >= 4)
        .map(|part| (part.unsigned_area(), part))
        .filter(|(area, _)| area.is_finite())
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, part)| part)
}

/// Projects `origin` onto every ring and interpolates back to a point,
/// keeping the closest result.
fn closest_on_boundary(shape: &Polygon<f64>, origin: Point<f64>) -> Option<Point<f64>> {
    std::iter::once(shape.exterior())
        .chain(shape.interiors())
        .filter(|ring| ring.0.len() >= 2)
        .filter_map(|ring| locate_on_ring(ring, origin))
        .filter(|candidate| candidate.x().is_finite() && candidate.y().is_finite())
        .min_by(|a, b| planar_distance(a.0, origin.0).total_cmp(&planar_distance(b.0, origin.0)))
}

fn locate_on_ring(ring: &LineString<f64>, origin: Point<f64>) -> Option<Point<f64>> {
    let fraction = ring.line_locate_point(&origin)?;
    ring.point_at_ratio_from_start(&Euclidean, fraction)
}

fn closest_on_surface(shape: &Polygon<f64>, origin: Point<f64>) -> Option<Point<f64>> {
    match shape.closest_point(&origin) {
        Closest::Intersection(point) | Closest::SinglePoint(point) => Some(point),
        Closest::Indeterminate => None,
    }
}

fn planar_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}
