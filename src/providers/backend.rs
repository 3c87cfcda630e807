//! Client for the delivery management backend REST API.
//!
//! The backend owns routes, delivery points and the route optimization
//! algorithm itself; this service only consumes them. Optimization is a
//! single opaque call.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::BackendConfig;
use crate::models::Route;
use crate::services::sequence::SequenceUpdate;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Route not found: {0}")]
    NotFound(String),
    #[error("Backend error: {0}")]
    Api(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct SequencePayload<'a> {
    delivery_points: &'a [SequenceUpdate],
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| BackendError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    pub async fn fetch_route(&self, route_id: &str) -> Result<Route, BackendError> {
        let url = format!(
            "{}/api/routes/{}",
            self.base_url,
            urlencoding::encode(route_id)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(route_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(BackendError::Api(format!(
                "Backend returned HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }

    /// Invoke the backend's route optimization. The algorithm is opaque to
    /// this service; the response is the reordered route.
    pub async fn optimize_route(&self, route_id: &str) -> Result<Route, BackendError> {
        info!(route_id = %route_id, "Requesting route optimization");

        let url = format!(
            "{}/api/routes/{}/optimize",
            self.base_url,
            urlencoding::encode(route_id)
        );

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(route_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(BackendError::Api(format!(
                "Backend returned HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }

    /// Persist manually-edited stop ordering and start/end flags
    pub async fn save_sequence(
        &self,
        route_id: &str,
        updates: &[SequenceUpdate],
    ) -> Result<(), BackendError> {
        let url = format!(
            "{}/api/routes/{}/delivery-points/sequence",
            self.base_url,
            urlencoding::encode(route_id)
        );

        let response = self
            .client
            .put(&url)
            .json(&SequencePayload {
                delivery_points: updates,
            })
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::Api(format!(
                "Backend returned HTTP {}",
                response.status()
            )));
        }

        info!(route_id = %route_id, points = updates.len(), "Sequence persisted");
        Ok(())
    }
}
