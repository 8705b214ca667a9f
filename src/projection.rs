//! WGS84 ⇄ UTM reprojection.
//!
//! Transverse Mercator via the Krüger series (third order), accurate to
//! well below a millimeter inside a zone. Area geometries are kept in this
//! frame so that boundary projection works in meters.

use geo::Coord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::GeoPoint;

const SEMI_MAJOR_AXIS_M: f64 = 6_378_137.0;
const FLATTENING: f64 = 1.0 / 298.257_223_563;
const SCALE_FACTOR: f64 = 0.9996;
const FALSE_EASTING_M: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH_M: f64 = 10_000_000.0;

/// Largest longitude offset from the central meridian we accept.
const MAX_MERIDIAN_OFFSET_DEG: f64 = 45.0;

/// Zone covering Brandenburg (EPSG:25833 / EPSG:32633).
pub const DEFAULT_ZONE: u8 = 33;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ProjectionError {
    #[error("invalid UTM zone {0}")]
    InvalidZone(u8),
    #[error("coordinate ({lat}, {lon}) is outside the projection domain")]
    OutOfDomain { lat: f64, lon: f64 },
    #[error("planar coordinate ({x}, {y}) cannot be inverted")]
    NotInvertible { x: f64, y: f64 },
}

/// A UTM zone on the WGS84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Utm {
    zone: u8,
    north: bool,
}

impl Default for Utm {
    fn default() -> Self {
        Self {
            zone: DEFAULT_ZONE,
            north: true,
        }
    }
}

impl Utm {
    pub fn new(zone: u8, north: bool) -> Result<Self, ProjectionError> {
        if !(1..=60).contains(&zone) {
            return Err(ProjectionError::InvalidZone(zone));
        }
        Ok(Self { zone, north })
    }

    pub fn zone(&self) -> u8 {
        self.zone
    }

    fn central_meridian_deg(&self) -> f64 {
        f64::from(self.zone) * 6.0 - 183.0
    }

    fn false_northing(&self) -> f64 {
        if self.north { 0.0 } else { FALSE_NORTHING_SOUTH_M }
    }

    /// Projects a geographic point to easting (`x`) / northing (`y`) meters.
    pub fn forward(&self, point: GeoPoint) -> Result<Coord<f64>, ProjectionError> {
        let out_of_domain = ProjectionError::OutOfDomain {
            lat: point.lat,
            lon: point.lon,
        };
        if !point.is_valid() || point.lat.abs() >= 90.0 {
            return Err(out_of_domain);
        }
        let offset_deg = normalize_deg(point.lon - self.central_meridian_deg());
        if offset_deg.abs() > MAX_MERIDIAN_OFFSET_DEG {
            return Err(out_of_domain);
        }

        let series = Series::get();
        let phi = point.lat.to_radians();
        let delta_lambda = offset_deg.to_radians();
        let c = 2.0 * series.n.sqrt() / (1.0 + series.n);

        let t = (phi.sin().atanh() - c * (c * phi.sin()).atanh()).sinh();
        let xi_prime = t.atan2(delta_lambda.cos());
        let eta_prime = (delta_lambda.sin() / (1.0 + t * t).sqrt()).atanh();

        let mut easting = eta_prime;
        let mut northing = xi_prime;
        for (j, alpha) in series.alpha.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            easting += alpha * (k * xi_prime).cos() * (k * eta_prime).sinh();
            northing += alpha * (k * xi_prime).sin() * (k * eta_prime).cosh();
        }

        let coord = Coord {
            x: FALSE_EASTING_M + SCALE_FACTOR * series.rectifying_radius * easting,
            y: self.false_northing() + SCALE_FACTOR * series.rectifying_radius * northing,
        };
        if coord.x.is_finite() && coord.y.is_finite() {
            Ok(coord)
        } else {
            Err(out_of_domain)
        }
    }

    /// Inverse of [`Utm::forward`].
    pub fn inverse(&self, coord: Coord<f64>) -> Result<GeoPoint, ProjectionError> {
        let not_invertible = ProjectionError::NotInvertible {
            x: coord.x,
            y: coord.y,
        };
        if !coord.x.is_finite() || !coord.y.is_finite() {
            return Err(not_invertible);
        }

        let series = Series::get();
        let scale = SCALE_FACTOR * series.rectifying_radius;
        let xi = (coord.y - self.false_northing()) / scale;
        let eta = (coord.x - FALSE_EASTING_M) / scale;

        let mut xi_prime = xi;
        let mut eta_prime = eta;
        for (j, beta) in series.beta.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi_prime -= beta * (k * xi).sin() * (k * eta).cosh();
            eta_prime -= beta * (k * xi).cos() * (k * eta).sinh();
        }

        let chi = (xi_prime.sin() / eta_prime.cosh()).asin();
        let mut phi = chi;
        for (j, delta) in series.delta.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            phi += delta * (k * chi).sin();
        }
        let lambda = eta_prime.sinh().atan2(xi_prime.cos());

        let lon = normalize_deg(self.central_meridian_deg() + lambda.to_degrees());
        GeoPoint::new(phi.to_degrees(), lon).ok_or(not_invertible)
    }
}

fn normalize_deg(deg: f64) -> f64 {
    let wrapped = (deg + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && deg > 0.0 { 180.0 } else { wrapped }
}

struct Series {
    n: f64,
    rectifying_radius: f64,
    alpha: [f64; 3],
    beta: [f64; 3],
    delta: [f64; 3],
}

impl Series {
    fn get() -> Self {
        let n = FLATTENING / (2.0 - FLATTENING);
        let n2 = n * n;
        let n3 = n2 * n;
        Self {
            n,
            rectifying_radius: SEMI_MAJOR_AXIS_M / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0),
            alpha: [
                n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
                13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
                61.0 * n3 / 240.0,
            ],
            beta: [
                n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0,
                n2 / 48.0 + n3 / 15.0,
                17.0 * n3 / 480.0,
            ],
            delta: [
                2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3,
                7.0 * n2 / 3.0 - 8.0 * n3 / 5.0,
                56.0 * n3 / 15.0,
            ],
        }
    }
}
