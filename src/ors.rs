//! openrouteservice HTTP adapter for single-leg foot routes.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

use crate::error::RoutingError;
use crate::model::GeoPoint;
use crate::polyline::Polyline;
use crate::routing::Route;
use crate::traits::RouteProvider;

/// Response bodies are cut to this many characters in error messages.
const BODY_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct OrsConfig {
    /// Full directions endpoint, including profile and `/geojson`.
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for OrsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/ors/v2/directions/foot-walking/geojson".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

impl OrsConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

#[derive(Debug, Clone)]
pub struct OrsClient {
    config: OrsConfig,
    client: reqwest::blocking::Client,
}

impl OrsClient {
    pub fn new(config: OrsConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OrsConfig {
        &self.config
    }

    fn convert_reqwest_error(&self, err: &reqwest::Error) -> RoutingError {
        if err.is_timeout() {
            RoutingError::Timeout {
                timeout_secs: self.config.timeout_secs,
            }
        } else {
            RoutingError::Network {
                message: err.to_string(),
            }
        }
    }
}

impl RouteProvider for OrsClient {
    fn route(&self, origin: GeoPoint, destination: GeoPoint) -> Result<Route, RoutingError> {
        if !origin.is_valid() || !destination.is_valid() {
            return Err(RoutingError::InvalidCoordinates);
        }

        let mut request = self
            .client
            .post(&self.config.base_url)
            .json(&DirectionsRequest::walk(origin, destination));
        if let Some(api_key) = &self.config.api_key {
            request = request.header(AUTHORIZATION, api_key);
        }

        let response = request.send().map_err(|err| self.convert_reqwest_error(&err))?;
        let status = response.status();
        let body = response.text().map_err(|err| self.convert_reqwest_error(&err))?;

        if !status.is_success() {
            return Err(RoutingError::Http {
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }

        parse_directions(&body)
    }
}

#[derive(Debug, Serialize)]
struct DirectionsRequest {
    coordinates: [[f64; 2]; 2],
    instructions: bool,
    geometry: bool,
    preference: &'static str,
}

impl DirectionsRequest {
    fn walk(origin: GeoPoint, destination: GeoPoint) -> Self {
        Self {
            coordinates: [[origin.lon, origin.lat], [destination.lon, destination.lat]],
            instructions: false,
            geometry: true,
            preference: "recommended",
        }
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    features: Option<Vec<RouteFeature>>,
}

#[derive(Debug, Deserialize)]
struct RouteFeature {
    properties: RouteProperties,
    geometry: Polyline,
}

#[derive(Debug, Deserialize)]
struct RouteProperties {
    summary: RouteSummary,
}

#[derive(Debug, Deserialize)]
struct RouteSummary {
    distance: Option<f64>,
}

/// Extracts distance and line geometry from a directions response body.
fn parse_directions(body: &str) -> Result<Route, RoutingError> {
    let malformed = |reason: &str| RoutingError::MalformedResponse {
        reason: reason.to_string(),
        body: excerpt(body),
    };

    let response: DirectionsResponse =
        serde_json::from_str(body).map_err(|err| malformed(&err.to_string()))?;
    let feature = response
        .features
        .and_then(|features| features.into_iter().next())
        .ok_or_else(|| malformed("missing route feature"))?;
    let distance_m = feature
        .properties
        .summary
        .distance
        .filter(|distance| distance.is_finite() && *distance >= 0.0)
        .ok_or_else(|| malformed("missing route distance"))?;

    Ok(Route {
        distance_m,
        geometry: Some(feature.geometry),
    })
}

fn excerpt(body: &str) -> String {
    if body.chars().count() <= BODY_EXCERPT_CHARS {
        body.to_string()
    } else {
        let mut cut: String = body.chars().take(BODY_EXCERPT_CHARS).collect();
        cut.push('…');
        cut
    }
}
