//! Road-network itinerary computation.
//!
//! Delegates to an OSRM-compatible routing service. The service speaks
//! (longitude, latitude) while the rest of this system is latitude-first;
//! the axis swap is isolated here, in both directions. Any failure maps to
//! `None` so callers fall back to straight-line segments.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::config::RoutingConfig;
use crate::models::{Itinerary, LatLng};

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Routing service error: {0}")]
    Service(String),
}

/// External road-routing lookup over an ordered coordinate list
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn route(&self, coordinates: &[LatLng]) -> Result<Itinerary, RoutingError>;
}

/// OSRM route API client
pub struct OsrmClient {
    client: reqwest::Client,
    base_url: String,
    profile: String,
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    /// Meters
    distance: f64,
    /// Seconds
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    /// GeoJSON order: (longitude, latitude)
    coordinates: Vec<[f64; 2]>,
}

impl OsrmClient {
    pub fn new(config: &RoutingConfig) -> Result<Self, RoutingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RoutingError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            profile: config.profile.clone(),
        })
    }
}

#[async_trait]
impl RoutingProvider for OsrmClient {
    async fn route(&self, coordinates: &[LatLng]) -> Result<Itinerary, RoutingError> {
        let url = format!(
            "{}/route/v1/{}/{}?overview=full&geometries=geojson",
            self.base_url,
            self.profile,
            coordinate_path(coordinates)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RoutingError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RoutingError::Service(format!(
                "Routing service returned HTTP {}",
                response.status()
            )));
        }

        let body: OsrmResponse = response
            .json()
            .await
            .map_err(|e| RoutingError::Parse(e.to_string()))?;

        if body.code != "Ok" {
            return Err(RoutingError::Service(format!(
                "Routing service returned code {}",
                body.code
            )));
        }

        let Some(route) = body.routes.into_iter().next() else {
            return Err(RoutingError::Service("Empty route list".to_string()));
        };

        Ok(convert_route(route))
    }
}

/// URL path fragment in the service's (longitude, latitude) axis order
fn coordinate_path(coordinates: &[LatLng]) -> String {
    coordinates
        .iter()
        .map(|c| format!("{:.6},{:.6}", c[1], c[0]))
        .collect::<Vec<_>>()
        .join(";")
}

/// Convert the service response back to latitude-first coordinates with
/// rounded distance (km) and duration (minutes)
fn convert_route(route: OsrmRoute) -> Itinerary {
    let coordinates = route
        .geometry
        .coordinates
        .into_iter()
        .map(|c| [c[1], c[0]])
        .collect();

    Itinerary {
        coordinates,
        distance_km: (route.distance / 1000.0).round(),
        duration_min: (route.duration / 60.0).round(),
    }
}

/// Computes road-network itineraries, degrading to `None` on any failure
pub struct ItineraryCalculator {
    provider: Arc<dyn RoutingProvider>,
}

impl ItineraryCalculator {
    pub fn new(provider: Arc<dyn RoutingProvider>) -> Self {
        Self { provider }
    }

    /// Request an itinerary through the given coordinates.
    ///
    /// Fewer than two coordinates, transport errors, non-success responses
    /// and empty route lists all yield `None`; callers render the
    /// straight-line fallback in that case.
    pub async fn calculate(&self, coordinates: &[LatLng]) -> Option<Itinerary> {
        if coordinates.len() < 2 {
            return None;
        }

        match self.provider.route(coordinates).await {
            Ok(itinerary) => Some(itinerary),
            Err(e) => {
                warn!(error = %e, "Itinerary calculation failed, using straight-line fallback");
                None
            }
        }
    }
}
