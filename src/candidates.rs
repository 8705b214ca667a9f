//! Candidate selection by straight-line distance.

use crate::haversine::haversine_m;
use crate::model::GeoPoint;
use crate::traits::Located;

/// Returns the destinations worth network-routing from `origin`.
///
/// Keeps every destination whose representative point lies within
/// `radius_m` (haversine). When none does, falls back to the single nearest
/// destination so that every origin gets at least one routing attempt. An
/// empty input yields an empty selection.
pub fn select<'a, T: Located>(origin: GeoPoint, destinations: &'a [T], radius_m: f64) -> Vec<&'a T> {
    let mut nearest: Option<(f64, &T)> = None;
    let mut within = Vec::new();

    for destination in destinations {
        let distance = haversine_m(origin, destination.representative_point());
        if distance <= radius_m {
            within.push(destination);
        }
        if nearest.is_none_or(|(best, _)| distance < best) {
            nearest = Some((distance, destination));
        }
    }

    if within.is_empty() {
        nearest.map(|(_, destination)| destination).into_iter().collect()
    } else {
        within
    }
}
